use crate::layout::PortalLayout;
use crate::page::{PortalError, PortalPage};
use loinc_model::Credentials;

/// Sign in through the portal's login form.
///
/// Opens the login page, types both credentials, submits, and waits for the
/// post-login navigation. Credentials are not validated here; an empty
/// value is submitted and left for the portal to reject.
pub async fn authenticate<P: PortalPage>(
    page: &mut P,
    layout: &PortalLayout,
    credentials: &Credentials,
) -> Result<(), PortalError> {
    tracing::info!(url = %layout.login_url, "Navigating to login page");
    page.goto(&layout.login_url).await?;

    if credentials.is_incomplete() {
        tracing::warn!("LOINC_USERNAME or LOINC_PASSWORD is empty, submitting anyway");
    }

    tracing::info!("Filling in credentials");
    page.type_text(&layout.username_field, &credentials.username).await?;
    page.type_text(&layout.password_field, &credentials.password).await?;

    tracing::info!("Submitting login form");
    page.click_and_wait(&layout.login_submit).await?;

    tracing::info!("Login submitted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Action, FakePage};

    #[tokio::test]
    async fn test_authenticate_fills_form_and_submits() {
        let layout = PortalLayout::default();
        let mut page = FakePage::new();

        authenticate(&mut page, &layout, &Credentials::new("alice", "secret"))
            .await
            .unwrap();

        assert_eq!(
            page.recorded(),
            vec![
                Action::Goto(layout.login_url.clone()),
                Action::Type {
                    selector: "#user_login".into(),
                    text: "alice".into()
                },
                Action::Type {
                    selector: "#user_pass".into(),
                    text: "secret".into()
                },
                Action::ClickAndWait("#wp-submit".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_credentials_still_submitted() {
        let layout = PortalLayout::default();
        let mut page = FakePage::new();

        authenticate(&mut page, &layout, &Credentials::new("", ""))
            .await
            .unwrap();

        assert!(page
            .recorded()
            .contains(&Action::ClickAndWait("#wp-submit".into())));
    }

    #[tokio::test]
    async fn test_missing_password_field_is_hard_error() {
        let layout = PortalLayout::default();
        let mut page = FakePage::new().with_missing("#user_pass");

        let err = authenticate(&mut page, &layout, &Credentials::new("alice", "secret"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PortalError::ElementNotFound { ref selector, .. } if selector == "#user_pass"
        ));
        assert!(!page
            .recorded()
            .contains(&Action::ClickAndWait("#wp-submit".into())));
    }
}
