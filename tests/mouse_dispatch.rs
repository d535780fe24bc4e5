mod common;

use common::{init_logging, lat_lng_at, sample_tile, FixtureFetcher, URL_TEMPLATE};
use maplet_mvt::{
    ClickHandlerOptions, LatLng, MapMouseEvent, MvtSourceOptions, TileId, TileLocation,
    TileManager, TileMouseEvent,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Click and hover dispatch: hit-testing, selection policy and debouncing
#[cfg(test)]
mod mouse_dispatch_tests {
    use super::*;

    const ZOOM: u8 = 2;

    fn tile() -> TileLocation {
        TileLocation::new(1, 1, ZOOM)
    }

    async fn loaded_manager(options: MvtSourceOptions) -> TileManager {
        init_logging();
        let fetcher = Arc::new(FixtureFetcher::new().with_tile(tile(), sample_tile()));
        let mut manager = TileManager::with_fetcher(options, fetcher);
        manager.get_tile(tile(), ZOOM);
        manager.settle().await;
        manager
    }

    fn event_at(px: f64, py: f64) -> MapMouseEvent {
        MapMouseEvent::new(lat_lng_at(tile(), px, py), ZOOM)
    }

    type Recorded = Rc<RefCell<Vec<TileMouseEvent>>>;

    fn recorder() -> (Recorded, impl FnMut(&TileMouseEvent) + 'static) {
        let events: Recorded = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        (events, move |event: &TileMouseEvent| sink.borrow_mut().push(event.clone()))
    }

    fn hit_ids(events: &Recorded) -> Vec<Option<String>> {
        events
            .borrow()
            .iter()
            .map(|event| event.feature_id().map(str::to_string))
            .collect()
    }

    fn first_layer_only() -> ClickHandlerOptions {
        ClickHandlerOptions::default().with_limit_to_first_visible_layer(true)
    }

    /// Each hit-tested layer reports once, topmost layer first
    #[tokio::test]
    async fn test_click_tests_layers_top_down() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        let (events, callback) = recorder();

        manager.on_click(event_at(64.0, 64.0), callback, ClickHandlerOptions::default());

        let events_ref = events.borrow();
        let layers: Vec<_> = events_ref.iter().map(|event| event.layer.clone().unwrap()).collect();
        assert_eq!(layers, vec!["pois", "roads", "water"]);
        drop(events_ref);
        assert_eq!(
            hit_ids(&events),
            vec![Some("pois:30".to_string()), None, Some("water:10".to_string())]
        );

        let events_ref = events.borrow();
        let first = &events_ref[0];
        let point = first.tile_point.unwrap();
        assert!((point.x - 64.0).abs() < 1e-6 && (point.y - 64.0).abs() < 1e-6);
        assert_eq!(first.feature.as_ref().unwrap().properties.get("name").unwrap(), "lighthouse");
        assert!(manager.selected_feature_ids().is_empty());
    }

    /// Stops at the first layer with a hit
    #[tokio::test]
    async fn test_limit_to_first_visible_layer() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        let (events, callback) = recorder();

        manager.on_click(event_at(100.0, 129.0), callback, first_layer_only());
        assert_eq!(hit_ids(&events), vec![None, Some("roads:20".to_string())]);
    }

    /// Lines accept hits within half their width plus the click tolerance
    #[tokio::test]
    async fn test_line_click_tolerance() {
        let mut manager = loaded_manager(
            MvtSourceOptions::new(URL_TEMPLATE).with_clickable_layers(["roads"]),
        )
        .await;

        let (near, callback) = recorder();
        manager.on_click(event_at(100.0, 130.4), callback, ClickHandlerOptions::default());
        assert_eq!(hit_ids(&near), vec![Some("roads:20".to_string())]);

        let (far, callback) = recorder();
        manager.on_click(event_at(100.0, 130.6), callback, ClickHandlerOptions::default());
        assert_eq!(hit_ids(&far), vec![None]);
    }

    /// Only clickable and visible layers are hit-tested
    #[tokio::test]
    async fn test_clickable_layers() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        manager.set_clickable_layers(Some(vec!["water".to_string(), "pois".to_string()]));
        manager.set_visible_layers(Some(vec!["water".to_string()]), true);

        let (events, callback) = recorder();
        manager.on_click(event_at(64.0, 64.0), callback, ClickHandlerOptions::default());
        assert_eq!(hit_ids(&events), vec![Some("water:10".to_string())]);
    }

    /// Clicks over tiles that are not shown are dropped and leave the
    /// selection alone
    #[tokio::test]
    async fn test_click_outside_visible_tiles() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        manager.feature_selected("roads:20");
        let (events, callback) = recorder();

        manager.on_click(
            MapMouseEvent::new(LatLng::new(-60.0, -150.0), ZOOM),
            callback,
            ClickHandlerOptions::default().with_set_selected(true),
        );
        assert!(events.borrow().is_empty());
        assert_eq!(manager.selected_feature_ids(), vec!["roads:20"]);
    }

    /// A shown tile with no clickable layer still reports once, without a
    /// feature
    #[tokio::test]
    async fn test_click_on_tile_without_clickable_layers() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        manager.set_clickable_layers(Some(Vec::new()));
        let (events, callback) = recorder();

        manager.on_click(event_at(64.0, 64.0), callback, ClickHandlerOptions::default());
        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tile_id, Some(TileId::new(ZOOM, 1, 1)));
        assert!(events[0].layer.is_none());
        assert!(events[0].feature.is_none());
    }

    /// Toggling selects on the first click and deselects on the second
    #[tokio::test]
    async fn test_toggle_selection() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        let options = first_layer_only().with_set_selected(true);

        let (events, callback) = recorder();
        manager.on_click(event_at(64.0, 64.0), callback, options.clone());
        assert!(manager.is_feature_selected("pois:30"));
        assert!(events.borrow()[0].feature.as_ref().unwrap().selected);

        let (_, callback) = recorder();
        manager.on_click(event_at(64.0, 64.0), callback, options.clone());
        assert!(!manager.is_feature_selected("pois:30"));

        let (_, callback) = recorder();
        let no_toggle = options.with_toggle_selection(false);
        manager.on_click(event_at(64.0, 64.0), callback, no_toggle.clone());
        let (_, callback) = recorder();
        manager.on_click(event_at(64.0, 64.0), callback, no_toggle);
        assert!(manager.is_feature_selected("pois:30"));
    }

    /// Single selection replaces, multiple selection accumulates, misses clear
    #[tokio::test]
    async fn test_selection_modes() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        let single = first_layer_only().with_set_selected(true);

        let (_, callback) = recorder();
        manager.on_click(event_at(64.0, 64.0), callback, single.clone());
        let (_, callback) = recorder();
        manager.on_click(event_at(100.0, 128.0), callback, single.clone());
        assert_eq!(manager.selected_feature_ids(), vec!["roads:20"]);

        let multiple = single.clone().with_multiple_selection(true);
        let (_, callback) = recorder();
        manager.on_click(event_at(64.0, 64.0), callback, multiple);
        assert_eq!(manager.selected_feature_ids(), vec!["pois:30", "roads:20"]);

        manager.set_clickable_layers(Some(vec!["pois".to_string()]));
        let (_, callback) = recorder();
        manager.on_click(event_at(200.0, 200.0), callback, single);
        assert!(manager.selected_feature_ids().is_empty());
    }

    /// Selected features are painted after the unselected ones of their layer
    #[tokio::test]
    async fn test_selected_feature_is_drawn_on_top() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        let id = TileId::new(ZOOM, 1, 1);
        let painted = |manager: &TileManager| -> Vec<String> {
            let context = manager.tile_context(&id).unwrap();
            context.canvas.painted_features().into_iter().map(str::to_string).collect()
        };

        manager.feature_selected("water:10");
        assert_eq!(painted(&manager), vec!["water:11", "water:10", "roads:20", "pois:30"]);
        assert_eq!(manager.get_selected_features_in_tile(&id).len(), 1);

        manager.deselect_all_features();
        assert_eq!(
            painted(&manager),
            vec!["water:10", "water:11", "roads:20", "pois:30"]
        );
    }

    /// Initially selected ids are honoured once their features load
    #[tokio::test]
    async fn test_initial_selection() {
        let mut manager = loaded_manager(
            MvtSourceOptions::new(URL_TEMPLATE).with_selected_features(["water:10", "elsewhere:1"]),
        )
        .await;
        assert!(manager.feature("water", "water:10").unwrap().is_selected());
        assert_eq!(manager.get_selected_features().len(), 1);
        assert_eq!(manager.selected_feature_ids(), vec!["elsewhere:1", "water:10"]);

        manager.set_selected_features(["roads:20"]);
        assert!(!manager.feature("water", "water:10").unwrap().is_selected());
        assert!(manager.feature("roads", "roads:20").unwrap().is_selected());
    }

    /// Two hovers 10 ms apart with a 50 ms delay dispatch only the second
    #[tokio::test]
    async fn test_hover_debounce_keeps_last_event() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        let options = first_layer_only().with_delay(50);
        let (events, callback) = recorder();
        let (stale, stale_callback) = recorder();

        manager.on_mouse_hover(event_at(64.0, 64.0), stale_callback, options.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.on_mouse_hover(event_at(100.0, 128.0), callback, options);

        assert_eq!(manager.process_mouse_events(), 0);
        assert!(events.borrow().is_empty());
        assert_eq!(manager.flush_mouse_events().await, 1);

        assert!(stale.borrow().is_empty());
        assert_eq!(hit_ids(&events), vec![None, Some("roads:20".to_string())]);
        assert!(!manager.has_pending_mouse_events());
    }

    /// Clicks and hovers are debounced independently
    #[tokio::test]
    async fn test_click_not_superseded_by_hover() {
        let mut manager = loaded_manager(MvtSourceOptions::new(URL_TEMPLATE)).await;
        let options = first_layer_only().with_delay(20);
        let (clicks, click_callback) = recorder();
        let (hovers, hover_callback) = recorder();

        manager.on_click(event_at(64.0, 64.0), click_callback, options.clone());
        manager.on_mouse_hover(event_at(100.0, 128.0), hover_callback, options);
        assert_eq!(manager.flush_mouse_events().await, 2);

        assert_eq!(hit_ids(&clicks), vec![Some("pois:30".to_string())]);
        assert_eq!(hit_ids(&hovers).last().cloned().flatten().as_deref(), Some("roads:20"));
    }
}
