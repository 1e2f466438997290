use serde::{Deserialize, Serialize};

/// Token metadata document served at `api/{tokenId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    pub image: String,
}

impl NftMetadata {
    pub const DESCRIPTION: &'static str = "Crypto Dev is a collection of developers in crypto";

    /// Metadata for `token_id`; images are stored zero-indexed under `image_base_url`.
    pub fn for_token(token_id: u64, image_base_url: &str) -> Self {
        Self {
            name: format!("Crypto Dev #{token_id}"),
            description: Self::DESCRIPTION.to_string(),
            image: format!(
                "{}/{}.svg",
                image_base_url.trim_end_matches('/'),
                token_id.saturating_sub(1)
            ),
        }
    }
}
