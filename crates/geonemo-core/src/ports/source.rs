use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Port for fetching a polygon file by reference
///
/// A reference is whatever the group catalog lists for a file: a relative
/// path, an absolute path, or a URL. Implementations resolve it against their
/// own root and return the parsed GeoJSON document. Any failure (missing
/// file, HTTP error, malformed JSON) is reported as an error; callers decide
/// how to degrade.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Load and parse the document behind `reference`
    async fn load(&self, reference: &str) -> Result<geojson::GeoJson>;

    /// Human-readable location a reference resolves to, for logs and reports
    fn locate(&self, reference: &str) -> String {
        reference.to_string()
    }
}

#[async_trait]
impl<S: FeatureSource + ?Sized> FeatureSource for Arc<S> {
    async fn load(&self, reference: &str) -> Result<geojson::GeoJson> {
        (**self).load(reference).await
    }

    fn locate(&self, reference: &str) -> String {
        (**self).locate(reference)
    }
}
