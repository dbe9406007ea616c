//! In-memory [`Codec`] for tests: keeps the last saved image as JSON.

use super::{Codec, CodecError};
use crate::store::Database;

#[derive(Debug, Default)]
pub struct MemoryCodec {
    image: Option<String>,
    pub saves: usize,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved image, if any.
    pub fn image(&self) -> Option<serde_json::Value> {
        self.image
            .as_deref()
            .map(|s| serde_json::from_str(s).expect("saved image is valid JSON"))
    }
}

impl Codec for MemoryCodec {
    fn load(&mut self) -> Result<Database, CodecError> {
        match &self.image {
            Some(text) => Ok(serde_json::from_str(text)?),
            None => Ok(Database::default()),
        }
    }

    fn save(&mut self, db: &Database) -> Result<(), CodecError> {
        self.image = Some(serde_json::to_string(db)?);
        self.saves += 1;
        Ok(())
    }
}
