use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::service::apply_cookie_list;
use super::state::GateState;
use crate::client::SessionClient;
use crate::provider::IdentityProvider;

/// Create the sign-in/sign-out router.
pub(crate) fn gate_routes<P>(state: GateState<P>) -> Router
where
    P: IdentityProvider + 'static,
{
    let auth_path = state.settings.auth_path.clone();

    Router::new()
        .route(&format!("{auth_path}/signin"), post(sign_in::<P>))
        .route(
            &format!("{auth_path}/signout"),
            get(sign_out::<P>).post(sign_out::<P>),
        )
        .with_state(state)
}

#[derive(Deserialize)]
struct SignInForm {
    email: String,
    password: String,
    #[serde(default)]
    redirect_to: Option<String>,
}

async fn sign_in<P: IdentityProvider + 'static>(
    State(state): State<GateState<P>>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Response {
    let mut client = SessionClient::new(state.provider.clone(), state.store_from(&jar));

    match client.sign_in(&form.email, &form.password).await {
        Ok(_) => {
            tracing::info!("password sign-in succeeded");
            let target = form
                .redirect_to
                .unwrap_or_else(|| state.settings.login_redirect.clone());
            let mut response = Redirect::to(&target).into_response();
            apply_cookie_list(&mut response, client.store_mut().take_cookies());
            response
        }
        Err(error) => {
            tracing::warn!(error = %error, "sign-in failed");
            sign_in_error(&state.settings.error_redirect, "invalid_credentials")
        }
    }
}

async fn sign_out<P: IdentityProvider + 'static>(
    State(state): State<GateState<P>>,
    jar: CookieJar,
) -> Response {
    let mut client = SessionClient::new(state.provider.clone(), state.store_from(&jar));
    client.sign_out().await;
    tracing::info!("signed out");

    let mut response = Redirect::to(&state.settings.logout_redirect).into_response();
    apply_cookie_list(&mut response, client.store_mut().take_cookies());
    response
}

fn sign_in_error(error_redirect: &str, code: &str) -> Response {
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{error_redirect}?error={encoded}")).into_response()
}
