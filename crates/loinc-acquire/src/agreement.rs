use crate::layout::PortalLayout;
use crate::page::{PortalError, PortalPage};

/// Tick the terms-of-use checkbox and submit it, which starts the file
/// transfer. Whether the checkbox actually toggled is not checked.
pub async fn accept_agreement<P: PortalPage>(
    page: &mut P,
    layout: &PortalLayout,
) -> Result<(), PortalError> {
    tracing::info!("Accepting terms and conditions");
    page.click(&layout.terms_checkbox).await?;
    page.click(&layout.terms_submit).await?;
    Ok(())
}
