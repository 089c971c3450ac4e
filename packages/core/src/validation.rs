use thiserror::Error;

/// Maximum tweet length, counted in Unicode scalar values.
pub const MAX_TWEET_CHARS: usize = 280;

/// Upload extensions the media store accepts, compared case-insensitively.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["gif", "jpeg", "jpg", "png"];

/// Errors returned when client input fails validation.
///
/// The `Display` text is sent to clients verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("The length of the tweet should not exceed 280 characters. Current value: {0}")]
    TweetTooLong(usize),

    #[error(
        "The image has an unresolved format. You can only download the following formats: {}",
        ALLOWED_IMAGE_EXTENSIONS.join(", ")
    )]
    UnsupportedImageFormat(String),
}

/// Check a tweet body against [`MAX_TWEET_CHARS`].
pub fn validate_tweet_text(text: &str) -> Result<(), ValidationError> {
    let len = text.chars().count();
    if len > MAX_TWEET_CHARS {
        return Err(ValidationError::TweetTooLong(len));
    }
    Ok(())
}

/// Return the lowercased extension of an uploaded file name if it is one of
/// [`ALLOWED_IMAGE_EXTENSIONS`].
///
/// Only the part after the last `.` counts, so `photo.tar.png` is a `png`.
pub fn image_extension(file_name: &str) -> Result<String, ValidationError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| ValidationError::UnsupportedImageFormat(file_name.to_string()))?;

    if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(ValidationError::UnsupportedImageFormat(file_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_at_limit_is_accepted() {
        assert!(validate_tweet_text(&"a".repeat(MAX_TWEET_CHARS)).is_ok());
        assert!(validate_tweet_text("").is_ok());
    }

    #[test]
    fn text_over_limit_reports_length() {
        let err = validate_tweet_text(&"a".repeat(394)).unwrap_err();
        assert_eq!(err, ValidationError::TweetTooLong(394));
        assert_eq!(
            err.to_string(),
            "The length of the tweet should not exceed 280 characters. Current value: 394"
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // 200 Cyrillic letters are 400 bytes of UTF-8.
        let text = "я".repeat(200);
        assert!(text.len() > MAX_TWEET_CHARS);
        assert!(validate_tweet_text(&text).is_ok());
    }

    #[test]
    fn allowed_extensions_are_case_insensitive() {
        assert_eq!(image_extension("cat.PNG").unwrap(), "png");
        assert_eq!(image_extension("a.b.jpeg").unwrap(), "jpeg");
        assert_eq!(image_extension("x.gif").unwrap(), "gif");
    }

    #[test]
    fn rejected_names() {
        for name in ["notes.txt", "no_extension", "image.png.exe", ""] {
            assert!(
                matches!(
                    image_extension(name),
                    Err(ValidationError::UnsupportedImageFormat(_))
                ),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn unsupported_format_message_lists_formats() {
        let msg = image_extension("bad.txt").unwrap_err().to_string();
        assert_eq!(
            msg,
            "The image has an unresolved format. You can only download the following formats: \
             gif, jpeg, jpg, png"
        );
    }
}
