use crate::Route;
use dioxus::prelude::*;

#[component]
pub fn NavComponent() -> Element {
    let app_state = use_context::<crate::components::AppState>();
    let wallet_address = app_state.wallet_address.read().clone();

    rsx! {
        div { class: "min-h-screen flex flex-col",
            nav { class: "nav-bar",
                div { class: "page-container",
                    div { class: "nav-logo",
                        div { class: "logo-icon" }
                        span { class: "logo-text", "Profile Studio" }
                    }

                    div { class: "nav-links",
                        Link {
                            to: Route::ProfileComponent {},
                            class: "nav-link",
                            active_class: "active",
                            "Profile"
                        }
                        if let Some(address) = wallet_address {
                            {
                                let short = if address.len() > 10 {
                                    format!("{}...{}", &address[..6], &address[address.len() - 4..])
                                } else {
                                    address.clone()
                                };
                                rsx! {
                                    span { class: "nav-wallet", title: "{address}", "{short}" }
                                }
                            }
                        } else {
                            span { class: "nav-wallet disconnected", "No wallet" }
                        }
                    }
                }
            }

            div { class: "flex-1",
                Outlet::<Route> {}
            }
        }
    }
}
