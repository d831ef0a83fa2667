//! Mock display controller for testing and development.
//!
//! Simulates a small OLED text panel: draws are staged off-screen and
//! become visible on present, the way the real controller's frame buffer
//! works. The handle exposes both the visible text and the raw operation
//! order so tests can assert staging discipline.

use crate::traits::RenderSink;
use std::sync::Arc;
use tagcue_core::{Error, Result, constants::DISPLAY_COLUMNS};
use tokio::sync::Mutex;

/// One recorded render operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    Clear,
    Text { x: usize, y: usize, text: String },
    Present,
}

#[derive(Debug, Default)]
struct DisplayState {
    /// Every operation in call order.
    ops: Vec<RenderOp>,

    /// Lines staged since the last clear, as (x, y, text).
    staged: Vec<(usize, usize, String)>,

    /// Lines on the panel, committed by the last present.
    visible: Vec<(usize, usize, String)>,

    clear_count: usize,
    present_count: usize,

    /// When set, every operation fails as if the panel fell off the bus.
    failing: bool,
}

impl DisplayState {
    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(Error::bus("display did not acknowledge"));
        }
        Ok(())
    }
}

/// Mock text display.
///
/// The display half implements [`RenderSink`]; the paired
/// [`MockDisplayHandle`] inspects what was drawn and injects faults.
///
/// # Examples
///
/// ```
/// use tagcue_hardware::mock::MockDisplay;
/// use tagcue_hardware::traits::RenderSink;
///
/// #[tokio::main]
/// async fn main() -> tagcue_core::Result<()> {
///     let (mut panel, handle) = MockDisplay::new();
///
///     panel.clear().await?;
///     panel.draw_text(0, 0, "No Tag detected").await?;
///     panel.present().await?;
///
///     assert_eq!(handle.visible_text().await, "No Tag detected");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl MockDisplay {
    /// Create a mock display with an empty panel.
    ///
    /// Returns the display half and the control handle.
    pub fn new() -> (Self, MockDisplayHandle) {
        let state = Arc::new(Mutex::new(DisplayState::default()));
        let display = MockDisplay {
            state: Arc::clone(&state),
        };
        (display, MockDisplayHandle { state })
    }
}

impl RenderSink for MockDisplay {
    async fn clear(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check()?;
        state.ops.push(RenderOp::Clear);
        state.staged.clear();
        state.clear_count += 1;
        Ok(())
    }

    async fn draw_text(&mut self, x: usize, y: usize, text: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check()?;
        // The panel is only so wide; anything past it never shows.
        let clipped: String = text.chars().take(DISPLAY_COLUMNS).collect();
        state.ops.push(RenderOp::Text {
            x,
            y,
            text: clipped.clone(),
        });
        state.staged.push((x, y, clipped));
        Ok(())
    }

    async fn present(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.check()?;
        state.ops.push(RenderOp::Present);
        state.visible = state.staged.clone();
        state.present_count += 1;
        Ok(())
    }
}

/// Handle for inspecting and controlling a [`MockDisplay`].
#[derive(Debug, Clone)]
pub struct MockDisplayHandle {
    state: Arc<Mutex<DisplayState>>,
}

impl MockDisplayHandle {
    /// Visible lines in top-to-bottom order.
    pub async fn visible_lines(&self) -> Vec<String> {
        let state = self.state.lock().await;
        let mut lines = state.visible.clone();
        lines.sort_by_key(|(_, y, _)| *y);
        lines.into_iter().map(|(_, _, text)| text).collect()
    }

    /// Visible panel content as one newline-joined string.
    pub async fn visible_text(&self) -> String {
        self.visible_lines().await.join("\n")
    }

    /// Every operation in call order.
    pub async fn ops(&self) -> Vec<RenderOp> {
        self.state.lock().await.ops.clone()
    }

    /// Number of clears issued.
    pub async fn clear_count(&self) -> usize {
        self.state.lock().await.clear_count
    }

    /// Number of presents issued.
    pub async fn present_count(&self) -> usize {
        self.state.lock().await.present_count
    }

    /// Make every subsequent operation fail, or restore the panel.
    pub async fn set_failing(&self, failing: bool) {
        self.state.lock().await.failing = failing;
    }
}
