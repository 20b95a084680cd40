//! UI panel descriptors handed to the host's frontend.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::settings::HistorySettings;

/// Static bundle + export the host loads to render the panel.
pub const PANEL_SOURCE: &str =
    "/static/plugins/stock-history/StockHistoryPanel.js:renderStockHistoryPanel";

/// Which page the host is about to render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PanelRequest {
    pub target_model: Option<String>,
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiPanel {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub source: &'static str,
    pub context: Value,
}

/// Panels to show for `request`.
///
/// Only part pages get the stock history panel. The current settings ride
/// along in the panel context so the frontend can read them without another
/// round trip.
pub fn panels_for(request: &PanelRequest, settings: &HistorySettings) -> Vec<UiPanel> {
    if request.target_model.as_deref() != Some("part") {
        return Vec::new();
    }

    vec![UiPanel {
        key: "stock-history",
        title: "Stock History",
        description: "Stock history",
        icon: "ti:chart-line:outline",
        source: PANEL_SOURCE,
        context: json!({ "settings": settings.to_json() }),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model: Option<&str>) -> PanelRequest {
        PanelRequest {
            target_model: model.map(str::to_string),
            target_id: Some("5".to_string()),
        }
    }

    #[test]
    fn part_pages_get_the_history_panel() {
        let panels = panels_for(&request(Some("part")), &HistorySettings::default());
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].key, "stock-history");
        assert_eq!(panels[0].context["settings"]["STOCK_DELETE_PERIOD"], 365);
    }

    #[test]
    fn other_pages_get_nothing() {
        let settings = HistorySettings::default();
        assert!(panels_for(&request(Some("stockitem")), &settings).is_empty());
        assert!(panels_for(&request(None), &settings).is_empty());
    }
}
