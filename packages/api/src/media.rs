use microblog::MediaId;
use serde::{Deserialize, Serialize};

/// Response to `POST /api/medias`: the id to pass in `tweet_media_ids` later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaCreated {
    pub result: bool,
    pub media_id: MediaId,
}

impl MediaCreated {
    pub fn new(media_id: MediaId) -> Self {
        Self {
            result: true,
            media_id,
        }
    }
}
