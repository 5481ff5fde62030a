//! Cross-page UI helpers.

use crate::device::Viewport;
use crate::page::Page;
use crate::result::ProbeResult;
use std::time::Duration;
use tracing::{info_span, Instrument};

/// Pause after a viewport change so the layout can settle
pub const ROTATION_SETTLE: Duration = Duration::from_millis(200);

/// Phone-sized portrait viewport
pub const PORTRAIT: Viewport = Viewport::new(390, 844);

/// [`PORTRAIT`] turned sideways
pub const LANDSCAPE: Viewport = PORTRAIT.landscape();

/// Rotate to landscape and back to portrait, attaching "Landscape" and
/// "Portrait" screenshots. Viewport errors propagate; capture errors do not.
pub async fn rotate_device(page: &Page) -> ProbeResult<()> {
    rotate_to(page, LANDSCAPE, "Landscape")
        .instrument(info_span!("step", name = "Rotate device to landscape"))
        .await?;
    rotate_to(page, PORTRAIT, "Portrait")
        .instrument(info_span!("step", name = "Rotate device to portrait"))
        .await
}

async fn rotate_to(page: &Page, viewport: Viewport, attachment: &str) -> ProbeResult<()> {
    page.set_viewport(viewport).await?;
    page.wait_for_timeout(ROTATION_SETTLE).await;
    screenshot_to_scenario(page, attachment).await;
    Ok(())
}

/// Attach a full-page screenshot named `{step_name}.png`
pub async fn screenshot_to_scenario(page: &Page, step_name: &str) {
    page.attach_screenshot(step_name).await;
}
