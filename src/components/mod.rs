pub mod nav_bar;
pub mod profile_page;

use crate::backend::profile::Profile;
use dioxus::prelude::*;

#[derive(Clone, Copy)]
pub struct AppState {
    pub wallet_address: Signal<Option<String>>,
    pub active_profile: Signal<Option<Profile>>,
    pub profile_loading: Signal<bool>,
    pub is_updating: Signal<bool>,
    pub update_error: Signal<Option<String>>,
    pub last_content_url: Signal<Option<String>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            wallet_address: use_signal(|| None),
            active_profile: use_signal(|| None),
            profile_loading: use_signal(|| true),
            is_updating: use_signal(|| false),
            update_error: use_signal(|| None),
            last_content_url: use_signal(|| None),
        }
    }
}
