//! Text screen model and rendering.
//!
//! A [`Screen`] is the device-independent description of what a panel
//! should show: text lines at pixel positions, one row per line. Rendering
//! stages the whole screen and presents it in one step so the panel never
//! shows a half-drawn frame.
//!
//! The [`VirtualPanel`] sink models the physical panel's character grid
//! (rows of fixed-width cells) and can announce each presented frame to the
//! log, which makes an emulated rig watchable from a terminal.

use crate::traits::RenderSink;
use tagcue_core::{
    Result,
    constants::{
        DISPLAY_CHAR_WIDTH_PX, DISPLAY_COLUMNS, DISPLAY_LINE_COUNT, DISPLAY_LINE_HEIGHT_PX,
    },
};
use tracing::info;

/// One line of text at a pixel position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenLine {
    pub x: usize,
    pub y: usize,
    pub text: String,
}

/// Full content of one panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Screen {
    lines: Vec<ScreenLine>,
}

impl Screen {
    /// Create an empty screen.
    #[must_use]
    pub fn new() -> Self {
        Screen::default()
    }

    /// Build a screen from newline-separated text.
    ///
    /// Each line lands at the left edge of its own row.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut screen = Screen::new();
        for line in text.split('\n') {
            screen.push_line(line);
        }
        screen
    }

    /// Append a line on the next row.
    pub fn push_line(&mut self, text: impl Into<String>) {
        let y = self.lines.len() * DISPLAY_LINE_HEIGHT_PX;
        self.lines.push(ScreenLine {
            x: 0,
            y,
            text: text.into(),
        });
    }

    /// Lines in top-to-bottom order.
    #[must_use]
    pub fn lines(&self) -> &[ScreenLine] {
        &self.lines
    }

    /// True when the screen has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Draw a screen onto a sink: clear, stage every line, present.
///
/// # Errors
/// Propagates the first sink failure; the panel keeps whatever it showed
/// before the attempt.
pub async fn render<S: RenderSink>(sink: &mut S, screen: &Screen) -> Result<()> {
    sink.clear().await?;
    for line in screen.lines() {
        sink.draw_text(line.x, line.y, &line.text).await?;
    }
    sink.present().await
}

/// In-memory panel with the real display's character geometry.
///
/// Pixel positions are mapped to character cells (rows of
/// [`DISPLAY_COLUMNS`] cells, [`DISPLAY_LINE_HEIGHT_PX`] pixels apart), so
/// text that would fall off the physical panel falls off here too. With
/// announcements enabled, every presented frame is logged under the
/// panel's label.
///
/// # Examples
///
/// ```
/// use tagcue_hardware::display::{Screen, VirtualPanel, render};
///
/// #[tokio::main]
/// async fn main() -> tagcue_core::Result<()> {
///     let mut panel = VirtualPanel::new("reader 0");
///     render(&mut panel, &Screen::from_text("No Tag detected")).await?;
///     assert_eq!(panel.lines()[0].trim_end(), "No Tag detected");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct VirtualPanel {
    label: String,
    staged: Vec<Vec<char>>,
    visible: Vec<Vec<char>>,
    announce: bool,
}

impl VirtualPanel {
    /// Create a blank panel under the given label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        let blank = vec![vec![' '; DISPLAY_COLUMNS]; DISPLAY_LINE_COUNT];
        VirtualPanel {
            label: label.into(),
            staged: blank.clone(),
            visible: blank,
            announce: false,
        }
    }

    /// Log every presented frame under the panel's label.
    #[must_use]
    pub fn with_announcements(mut self, announce: bool) -> Self {
        self.announce = announce;
        self
    }

    /// The panel's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Visible rows, each padded to the panel width.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.visible.iter().map(|row| row.iter().collect()).collect()
    }

    /// Visible content as one line: non-empty rows trimmed and joined.
    #[must_use]
    pub fn visible_text(&self) -> String {
        self.visible
            .iter()
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .filter(|row| !row.is_empty())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl RenderSink for VirtualPanel {
    async fn clear(&mut self) -> Result<()> {
        for row in &mut self.staged {
            row.fill(' ');
        }
        Ok(())
    }

    async fn draw_text(&mut self, x: usize, y: usize, text: &str) -> Result<()> {
        let row = y / DISPLAY_LINE_HEIGHT_PX;
        let Some(cells) = self.staged.get_mut(row) else {
            // Below the bottom edge; the physical panel drops it too.
            return Ok(());
        };
        let start = x / DISPLAY_CHAR_WIDTH_PX;
        for (i, ch) in text.chars().enumerate() {
            match cells.get_mut(start + i) {
                Some(cell) => *cell = ch,
                None => break,
            }
        }
        Ok(())
    }

    async fn present(&mut self) -> Result<()> {
        self.visible = self.staged.clone();
        if self.announce {
            info!("[{}] {}", self.label, self.visible_text());
        }
        Ok(())
    }
}
