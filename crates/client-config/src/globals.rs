use std::sync::Arc;

use arc_swap::ArcSwapOption;
use once_cell::sync::Lazy;

use crate::AdminConfig;

/// Process-wide published settings.
pub static GLOBALS: Lazy<Globals> = Lazy::new(Globals::new);

/// Values other page code reads after bootstrap. The API base and image root
/// are write-once so a value set explicitly before bootstrap is kept.
#[derive(Default)]
pub struct Globals {
    api_base: ArcSwapOption<String>,
    image_root: ArcSwapOption<String>,
    admin_config: ArcSwapOption<AdminConfig>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_base(&self) -> Option<String> {
        self.api_base.load_full().map(|v| v.as_ref().clone())
    }

    pub fn image_root(&self) -> Option<String> {
        self.image_root.load_full().map(|v| v.as_ref().clone())
    }

    pub fn admin_config(&self) -> Option<Arc<AdminConfig>> {
        self.admin_config.load_full()
    }

    /// Set the API base unless one is already published. Returns whether it was set.
    pub fn set_api_base_if_unset(&self, value: &str) -> bool {
        set_once(&self.api_base, value)
    }

    /// Set the image root unless one is already published or `value` is empty.
    pub fn set_image_root_if_unset(&self, value: &str) -> bool {
        !value.is_empty() && set_once(&self.image_root, value)
    }

    pub fn publish(&self, config: &AdminConfig) {
        self.set_api_base_if_unset(&config.api_base);
        self.set_image_root_if_unset(&config.image_root);
        self.admin_config.store(Some(Arc::new(config.clone())));
    }
}

fn set_once(slot: &ArcSwapOption<String>, value: &str) -> bool {
    let prev = slot.compare_and_swap(&None::<Arc<String>>, Some(Arc::new(value.to_string())));
    prev.is_none()
}
