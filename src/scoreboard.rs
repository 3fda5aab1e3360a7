//! Scoreboard dock and overlay
//!
//! A concrete pair used by the `--demo` command: the dock keeps two team
//! names and scores, the overlay shows them.

use serde_json::Value;

use crate::elements::{escape_html, Controls, DockBehavior, Markup, OverlayBehavior};
use crate::shared::State;

pub const HOME_SCORE: &str = "home_score";
pub const AWAY_SCORE: &str = "away_score";
pub const HOME_NAME: &str = "home_name";
pub const AWAY_NAME: &str = "away_name";

fn bump(state: &mut State, key: &str, delta: i64) {
    let next = (state.get_i64(key).unwrap_or(0) + delta).max(0);
    state.set(key, next);
}

/// Control panel with +/- buttons per team
#[derive(Debug, Default)]
pub struct ScoreboardDock;

impl DockBehavior for ScoreboardDock {
    fn default_state(&self) -> State {
        let mut state = State::new();
        state.set(HOME_NAME, "Home");
        state.set(AWAY_NAME, "Away");
        state.set(HOME_SCORE, 0);
        state.set(AWAY_SCORE, 0);
        state
    }

    fn setup(&mut self, controls: &mut Controls) {
        controls.on("home_up", |state: &mut State| bump(state, HOME_SCORE, 1));
        controls.on("home_down", |state: &mut State| bump(state, HOME_SCORE, -1));
        controls.on("away_up", |state: &mut State| bump(state, AWAY_SCORE, 1));
        controls.on("away_down", |state: &mut State| bump(state, AWAY_SCORE, -1));
        controls.on("reset", |state: &mut State| {
            state.set(HOME_SCORE, 0);
            state.set(AWAY_SCORE, 0);
        });
    }

    fn template(&self, state: &State) -> Option<Markup> {
        let row = |name_key: &str, score_key: &str, prefix: &str| {
            format!(
                "<div class=\"team\"><span>{}</span><button data-handler=\"{prefix}_down\">-</button>\
                 <span>{}</span><button data-handler=\"{prefix}_up\">+</button></div>",
                escape_html(state.get_str(name_key).unwrap_or_default()),
                state.get_i64(score_key).unwrap_or(0),
            )
        };
        Some(Markup::new(format!(
            "{}{}<button data-handler=\"reset\">Reset</button>",
            row(HOME_NAME, HOME_SCORE, "home"),
            row(AWAY_NAME, AWAY_SCORE, "away"),
        )))
    }
}

/// Display of both teams and scores
#[derive(Debug, Default)]
pub struct ScoreboardOverlay;

impl OverlayBehavior for ScoreboardOverlay {
    fn template(&self, state: &State) -> Option<Markup> {
        let text = |key: &str| escape_html(&state.display_value(key).unwrap_or_default());
        let score = |key: &str| match state.get(key) {
            Some(Value::Number(n)) => n.to_string(),
            _ => "-".to_string(),
        };
        Some(Markup::new(format!(
            "<div class=\"scoreboard\"><span class=\"home\">{} {}</span>\
             <span class=\"away\">{} {}</span></div><slot></slot>",
            text(HOME_NAME),
            score(HOME_SCORE),
            score(AWAY_SCORE),
            text(AWAY_NAME),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Origin;
    use crate::context::{ContextDetector, Document, StyleSheet};
    use crate::elements::{Dock, Overlay, SlotOverlay};
    use std::time::Duration;

    fn captured_document() -> Document {
        let doc = Document::loaded();
        doc.add_stylesheet(StyleSheet::linked("data:text/css;base64,Ym9keXt9"));
        doc
    }

    #[test]
    fn test_scores_never_go_negative() {
        let mut state = State::new();
        bump(&mut state, HOME_SCORE, -1);
        assert_eq!(state.get_i64(HOME_SCORE), Some(0));
        bump(&mut state, HOME_SCORE, 2);
        assert_eq!(state.get_i64(HOME_SCORE), Some(2));
    }

    #[test]
    fn test_overlay_template_escapes_names() {
        let mut state = State::new();
        state.set(HOME_NAME, "<Blue>");
        state.set(HOME_SCORE, 1);
        let markup = ScoreboardOverlay.template(&state).unwrap();
        assert!(markup.as_str().contains("&lt;Blue&gt; 1"));
        assert!(markup.as_str().contains("<span class=\"away\">- </span>"));
    }

    #[tokio::test]
    async fn test_match_scenario() {
        let origin = Origin::in_memory();
        let detector = ContextDetector::default();

        let dock_ctx = origin.open("http://localhost/match/42", Document::loaded()).unwrap();
        let overlay_ctx = origin.open("http://localhost/match/42", captured_document()).unwrap();

        let mut overlay = Overlay::new(SlotOverlay).with_mirror("score");
        overlay.connect(&overlay_ctx, &detector).await.unwrap();
        assert_eq!(overlay.mirror("score"), Some(""));
        assert!(overlay.state().get("score").is_none());

        let mut dock = Dock::new(ScoreboardDock);
        dock.connect(&dock_ctx, &detector).await.unwrap();
        *dock.state_mut() = State::new();
        dock.state_mut().set("score", 3);
        dock.commit().unwrap();

        assert_eq!(overlay.process_signals().unwrap(), 1);
        assert_eq!(overlay.mirror("score"), Some("3"));
        assert_eq!(overlay.state(), dock.state());
    }

    #[tokio::test]
    async fn test_overlay_matches_dock_after_interactions() {
        let origin = Origin::in_memory();
        let detector = ContextDetector::default();

        let dock_ctx = origin.open("/finals", Document::loaded()).unwrap();
        let overlay_ctx = origin.open("/finals", captured_document()).unwrap();

        let mut dock = Dock::new(ScoreboardDock);
        let mut overlay = Overlay::new(ScoreboardOverlay)
            .with_mirror(HOME_SCORE)
            .with_mirror(AWAY_SCORE);

        dock.connect(&dock_ctx, &detector).await.unwrap();
        overlay.connect(&overlay_ctx, &detector).await.unwrap();

        dock.interact("home_up").unwrap();
        dock.interact("home_up").unwrap();
        dock.interact("away_up").unwrap();
        overlay.process_signals().unwrap();

        assert_eq!(overlay.state(), dock.state());
        assert_eq!(overlay.mirror(HOME_SCORE), Some("2"));
        assert_eq!(overlay.mirror(AWAY_SCORE), Some("1"));
        assert!(overlay.rendered().unwrap().as_str().contains("Home 2"));

        dock.interact("reset").unwrap();
        overlay.process_signals().unwrap();
        assert_eq!(overlay.mirror(HOME_SCORE), Some("0"));
    }

    #[tokio::test]
    async fn test_other_namespace_is_unaffected() {
        let origin = Origin::in_memory();
        let detector = ContextDetector::default();

        let dock_ctx = origin.open("/match/1", Document::loaded()).unwrap();
        let overlay_ctx = origin.open("/match/2", captured_document()).unwrap();

        let mut dock = Dock::new(ScoreboardDock);
        let mut overlay = Overlay::new(ScoreboardOverlay).with_mirror(HOME_SCORE);
        dock.connect(&dock_ctx, &detector).await.unwrap();
        overlay.connect(&overlay_ctx, &detector).await.unwrap();

        dock.interact("home_up").unwrap();
        // The signal is origin-wide, but the re-read finds nothing for /match/2
        assert_eq!(overlay.process_signals().unwrap(), 1);
        assert_eq!(overlay.mirror(HOME_SCORE), Some(""));
    }

    #[tokio::test]
    async fn test_debug_page_drives_itself() {
        let origin = Origin::in_memory();
        let detector = ContextDetector::default();
        let ctx = origin.open("/solo#debug", Document::loaded()).unwrap();

        let mut dock = Dock::new(ScoreboardDock);
        let mut overlay = Overlay::new(ScoreboardOverlay).with_mirror(AWAY_SCORE);
        dock.connect(&ctx, &detector).await.unwrap();
        overlay.connect(&ctx, &detector).await.unwrap();

        dock.interact("away_up").unwrap();
        // Only the in-page event reaches a listener in the committing page
        assert_eq!(overlay.process_signals().unwrap(), 1);
        assert_eq!(overlay.mirror(AWAY_SCORE), Some("1"));
    }

    #[tokio::test]
    async fn test_overlay_waits_for_late_host_stylesheet() {
        let origin = Origin::in_memory();
        let detector = ContextDetector::new(
            std::sync::Arc::new(crate::context::StylesheetProbe::new(Duration::from_millis(30))),
            Default::default(),
        );
        let doc = Document::loading();
        let ctx = origin.open("/late", doc.clone()).unwrap();

        let attach = tokio::spawn(async move {
            let mut overlay = Overlay::new(SlotOverlay);
            let role = overlay.connect(&ctx, &detector).await.unwrap();
            (role, overlay.phase())
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        doc.complete_load();
        doc.add_stylesheet(StyleSheet::linked("data:text/css,"));

        let (role, phase) = attach.await.unwrap();
        assert_eq!(role, crate::context::Role::Overlay);
        assert_eq!(phase, crate::elements::Phase::Active);
    }
}
