mod backend;
mod components;

use backend::{AppCmd, AppEvent};
use components::nav_bar::NavComponent;
use components::profile_page::ProfileComponent;
use components::AppState;

use dioxus::prelude::*;
use tokio::sync::mpsc;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[layout(NavComponent)]
    #[route("/")]
    ProfileComponent {},
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    tracing_subscriber::fmt::init();
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    let app_state = AppState::new();
    use_context_provider(|| app_state);

    let cmd_tx = use_hook(|| {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<AppCmd>();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();

        spawn(async move {
            backend::init(cmd_rx, event_tx).await;
        });
        spawn(async move {
            let mut state = app_state;
            while let Some(event) = event_rx.recv().await {
                apply_event(&mut state, event);
            }
        });

        cmd_tx
    });
    use_context_provider(|| cmd_tx);

    rsx! {
        document::Stylesheet { href: asset!("/assets/main.css") }
        Router::<Route> {}
    }
}

fn apply_event(state: &mut AppState, event: AppEvent) {
    match event {
        AppEvent::WalletReady(address) => {
            state.wallet_address.set(Some(address));
        }
        AppEvent::ProfileFetched(profile) => {
            state.active_profile.set(profile);
            state.profile_loading.set(false);
        }
        AppEvent::ProfileUpdated { content_url } => {
            state.is_updating.set(false);
            state.update_error.set(None);
            state.last_content_url.set(Some(content_url));
        }
        AppEvent::UpdateFailed(reason) => {
            state.is_updating.set(false);
            state.update_error.set(Some(reason));
        }
    }
}
