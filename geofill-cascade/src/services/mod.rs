//! Service adapters
//!
//! Concrete implementations of the collaborator traits in [`crate::types`]:
//! - **vision_client** - Google Cloud Vision (landmark, web, text)
//! - **wikipedia_client** - Wikipedia knowledge base
//! - **nominatim_client** - Nominatim geocoder
//! - **exiftool** - metadata reader and writer
//! - **fingerprinter** - perceptual hash
//! - **file_scanner** - folder enumeration

pub mod exiftool;
pub mod file_scanner;
pub mod fingerprinter;
pub mod nominatim_client;
pub mod vision_client;
pub mod wikipedia_client;

pub use exiftool::ExifTool;
pub use file_scanner::{FileScanner, ScanError};
pub use fingerprinter::PerceptualHasher;
pub use nominatim_client::NominatimClient;
pub use vision_client::VisionClient;
pub use wikipedia_client::WikipediaClient;

use std::sync::Arc;
use tracing::warn;

use crate::config::CascadeSettings;
use crate::error::{CascadeError, CascadeResult};
use crate::gazetteer::Gazetteer;
use crate::pipeline::VisionServices;
use crate::types::{Fingerprinter, MetadataReader, MetadataWriter};

/// Every external collaborator a session needs
#[derive(Clone)]
pub struct ServiceRegistry {
    pub vision: VisionServices,
    pub gazetteer: Arc<Gazetteer>,
    pub reader: Arc<dyn MetadataReader>,
    pub writer: Arc<dyn MetadataWriter>,
    pub fingerprinter: Arc<dyn Fingerprinter>,
}

impl ServiceRegistry {
    /// Production services built from resolved settings
    pub fn from_settings(settings: &CascadeSettings) -> CascadeResult<Self> {
        let vision = Arc::new(
            VisionClient::new(settings.vision_api_key.clone())
                .map_err(|e| CascadeError::Config(e.to_string()))?,
        );
        if !vision.has_api_key() {
            warn!("No vision API key configured; landmark, web and text detection will be skipped");
        }

        let wikipedia = WikipediaClient::new(&settings.user_agent, settings.geocoder_timeout)
            .map_err(|e| CascadeError::Config(e.to_string()))?;
        let nominatim = NominatimClient::new(&settings.user_agent, settings.geocoder_timeout)
            .map_err(|e| CascadeError::Config(e.to_string()))?;
        let gazetteer = Gazetteer::new(Arc::new(wikipedia), Arc::new(nominatim))
            .with_languages(settings.languages.clone());

        let exiftool = Arc::new(ExifTool::new(settings.exiftool_path.clone()));

        Ok(Self {
            vision: VisionServices {
                landmark: vision.clone(),
                web: vision.clone(),
                text: vision,
            },
            gazetteer: Arc::new(gazetteer),
            reader: exiftool.clone(),
            writer: exiftool,
            fingerprinter: Arc::new(PerceptualHasher::new()),
        })
    }
}
