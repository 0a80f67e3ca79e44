//! Column type → handler lookup.

use std::collections::HashMap;
use std::sync::Arc;

use super::advanced::{
    AuditStampHandler, ButtonHandler, ColorPickerHandler, ConnectBoardsHandler, DependencyHandler,
    DocHandler, FormulaHandler, MirrorHandler, ProgressHandler, TimeTrackingHandler, TimelineHandler,
    VoteHandler,
};
use super::basic::{
    AutoNumberHandler, CheckboxHandler, CountryHandler, DateHandler, EmailHandler, FileHandler,
    HourHandler, ItemIdHandler, LinkHandler, LongTextHandler, NumberHandler, PhoneHandler,
    RatingHandler, TagsHandler, TextHandler, WeekHandler, WorldClockHandler,
};
use super::labels::{DropdownHandler, StatusHandler};
use super::location::LocationHandler;
use super::ColumnHandler;
use crate::cache::LocationCache;
use crate::models::ColumnKind;
use crate::validation::Geocoder;

/// Immutable table with one handler per [`ColumnKind`].
pub struct HandlerRegistry {
    handlers: HashMap<ColumnKind, Arc<dyn ColumnHandler>>,
    location_cache: Arc<LocationCache>,
}

impl HandlerRegistry {
    /// Registry with a default-sized location cache.
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self::with_location_cache(geocoder, Arc::new(LocationCache::new()))
    }

    pub fn with_location_cache(geocoder: Arc<dyn Geocoder>, location_cache: Arc<LocationCache>) -> Self {
        let handlers: Vec<Arc<dyn ColumnHandler>> = vec![
            Arc::new(TextHandler::new(ColumnKind::Name)),
            Arc::new(TextHandler::new(ColumnKind::Text)),
            Arc::new(LongTextHandler),
            Arc::new(NumberHandler),
            Arc::new(DateHandler),
            Arc::new(EmailHandler),
            Arc::new(LocationHandler::new(geocoder, location_cache.clone())),
            Arc::new(CheckboxHandler),
            Arc::new(StatusHandler),
            Arc::new(DropdownHandler),
            Arc::new(TagsHandler),
            Arc::new(LinkHandler),
            Arc::new(WorldClockHandler),
            Arc::new(CountryHandler),
            Arc::new(PhoneHandler),
            Arc::new(RatingHandler),
            Arc::new(FileHandler),
            Arc::new(FormulaHandler),
            Arc::new(ConnectBoardsHandler),
            Arc::new(AuditStampHandler::creation_log()),
            Arc::new(DependencyHandler),
            Arc::new(TimeTrackingHandler),
            Arc::new(ColorPickerHandler),
            Arc::new(ButtonHandler),
            Arc::new(AuditStampHandler::last_updated()),
            Arc::new(MirrorHandler),
            Arc::new(ProgressHandler),
            Arc::new(VoteHandler),
            Arc::new(ItemIdHandler),
            Arc::new(AutoNumberHandler),
            Arc::new(TimelineHandler),
            Arc::new(HourHandler),
            Arc::new(WeekHandler),
            Arc::new(DocHandler),
        ];

        Self {
            handlers: handlers.into_iter().map(|h| (h.kind(), h)).collect(),
            location_cache,
        }
    }

    /// Handler for an upstream type tag (aliases accepted). `None` means the
    /// column type is unsupported.
    pub fn get(&self, column_type: &str) -> Option<Arc<dyn ColumnHandler>> {
        let kind: ColumnKind = column_type.parse().ok()?;
        self.get_kind(kind)
    }

    pub fn get_kind(&self, kind: ColumnKind) -> Option<Arc<dyn ColumnHandler>> {
        self.handlers.get(&kind).cloned()
    }

    pub fn supports(&self, column_type: &str) -> bool {
        self.get(column_type).is_some()
    }

    /// Supported tags in registry order.
    pub fn supported_types(&self) -> Vec<&'static str> {
        ColumnKind::ALL
            .iter()
            .filter(|kind| self.handlers.contains_key(*kind))
            .map(ColumnKind::as_str)
            .collect()
    }

    pub fn location_cache(&self) -> &Arc<LocationCache> {
        &self.location_cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::StubGeocoder;
    use crate::models::Settings;
    use serde_json::json;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::new(Arc::new(StubGeocoder::found()))
    }

    #[test]
    fn test_every_kind_registered() {
        let registry = registry();
        assert_eq!(registry.supported_types().len(), ColumnKind::ALL.len());
        for kind in ColumnKind::ALL {
            assert_eq!(registry.get_kind(kind).unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_aliases_and_unknown_tags() {
        let registry = registry();
        assert_eq!(registry.get("numbers").unwrap().kind(), ColumnKind::Numeric);
        assert_eq!(registry.get("color").unwrap().kind(), ColumnKind::Status);
        assert!(registry.get("subtasks").is_none());
        assert!(!registry.supports(""));
    }

    #[tokio::test]
    async fn test_location_handler_shares_registry_cache() {
        let registry = registry();
        let handler = registry.get("location").unwrap();
        handler.validate_value(&json!("Denver"), &Settings::default()).await;
        assert!(registry.location_cache().contains("Denver"));
    }

    #[test]
    fn test_rules_carry_tag() {
        let registry = registry();
        let rules = registry.get("name").unwrap().validation_rules(&Settings::default());
        assert_eq!(rules, json!({"type": "name", "required": false}));
    }
}
