use crate::backend::profile::{resolve_picture_url, FormAttributes, ProfileForm};
use crate::backend::AppCmd;
use dioxus::prelude::*;

#[component]
pub fn ProfileComponent() -> Element {
    let app_state = use_context::<crate::components::AppState>();
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();

    let mut form = use_signal(ProfileForm::default);
    let mut is_updating = app_state.is_updating;

    // Initial data fetch - runs once on mount
    let mut has_fetched = use_signal(|| false);
    if !has_fetched() {
        has_fetched.set(true);
        let _ = cmd_tx.send(AppCmd::FetchActiveProfile);
    }

    // Copy the six attributes out of the loaded profile once. Name and bio
    // stay as typed; only the attribute mapping is reconciled on load.
    let mut attributes_synced = use_signal(|| false);
    if !attributes_synced() {
        if let Some(profile) = app_state.active_profile.read().as_ref() {
            form.write().attributes = FormAttributes::from_profile(profile);
            attributes_synced.set(true);
        }
    }

    // Pre-read all state before RSX
    let profile = app_state.active_profile.read().clone();
    let loading = *app_state.profile_loading.read();
    let updating = *app_state.is_updating.read();
    let update_error = app_state.update_error.read().clone();
    let last_content_url = app_state.last_content_url.read().clone();
    let f = form.read().clone();

    let on_submit = {
        let cmd_tx = cmd_tx.clone();
        move |_| {
            let cmd = AppCmd::UpdateProfile { form: form() };
            if let Err(e) = cmd_tx.send(cmd) {
                eprintln!("Failed to send UpdateProfile command: {:?}", e);
            } else {
                is_updating.set(true);
            }
        }
    };

    rsx! {
        div { class: "page-container py-8",
            if let Some(profile) = profile {
                div { class: "panel",
                    div { class: "profile-header",
                        img {
                            class: "avatar",
                            src: resolve_picture_url(&profile),
                            alt: "{profile.handle}",
                        }
                        div {
                            if let Some(name) = &profile.name {
                                p { class: "profile-name", "{name}" }
                            }
                            p { class: "profile-handle", "{profile.handle}" }
                        }
                    }

                    div { class: "form-stack",
                        div { class: "form-group",
                            label { class: "form-label", r#for: "name", "Name" }
                            div { class: "input-row",
                                input {
                                    class: "input",
                                    id: "name",
                                    value: "{f.name}",
                                    oninput: move |e| form.write().set_field("name", e.value()),
                                }
                            }
                        }
                        div { class: "form-group",
                            label { class: "form-label", r#for: "bio", "Bio" }
                            textarea {
                                class: "input",
                                id: "bio",
                                rows: "4",
                                value: "{f.bio}",
                                oninput: move |e| form.write().set_field("bio", e.value()),
                            }
                        }
                        div { class: "form-group",
                            label { class: "form-label", r#for: "location", "Location" }
                            div { class: "input-row",
                                input {
                                    class: "input",
                                    id: "location",
                                    value: "{f.attributes.location}",
                                    oninput: move |e| form.write().set_field("location", e.value()),
                                }
                            }
                        }
                        div { class: "form-group",
                            label { class: "form-label", r#for: "website", "Website" }
                            div { class: "input-row",
                                input {
                                    class: "input",
                                    id: "website",
                                    value: "{f.attributes.website}",
                                    oninput: move |e| form.write().set_field("website", e.value()),
                                }
                            }
                        }
                        div { class: "form-group",
                            label { class: "form-label", r#for: "twitter", "Twitter" }
                            div { class: "input-row",
                                span { class: "input-prefix", "twitter.com/" }
                                input {
                                    class: "input",
                                    id: "twitter",
                                    value: "{f.attributes.twitter}",
                                    oninput: move |e| form.write().set_field("twitter", e.value()),
                                }
                            }
                        }
                        div { class: "form-group",
                            label { class: "form-label", r#for: "instagram", "Instagram" }
                            div { class: "input-row",
                                span { class: "input-prefix", "instagram.com/" }
                                input {
                                    class: "input",
                                    id: "instagram",
                                    value: "{f.attributes.instagram}",
                                    oninput: move |e| form.write().set_field("instagram", e.value()),
                                }
                            }
                        }
                        div { class: "form-group",
                            label { class: "form-label", r#for: "github", "GitHub" }
                            div { class: "input-row",
                                span { class: "input-prefix", "github.com/" }
                                input {
                                    class: "input",
                                    id: "github",
                                    value: "{f.attributes.github}",
                                    oninput: move |e| form.write().set_field("github", e.value()),
                                }
                            }
                        }
                        div { class: "form-group",
                            label { class: "form-label", r#for: "linkedin", "LinkedIn" }
                            div { class: "input-row",
                                span { class: "input-prefix", "linkedin.com/in/" }
                                input {
                                    class: "input",
                                    id: "linkedin",
                                    value: "{f.attributes.linkedin}",
                                    oninput: move |e| form.write().set_field("linkedin", e.value()),
                                }
                            }
                        }

                        div { class: "action-group",
                            button {
                                class: "btn btn-primary",
                                disabled: updating,
                                onclick: on_submit,
                                if updating { "Saving..." } else { "Save" }
                            }
                        }

                        if let Some(error) = update_error {
                            p { class: "form-error", "{error}" }
                        }
                        if let Some(url) = last_content_url {
                            p { class: "form-hint", "Metadata stored at {url}" }
                        }
                    }
                }
            } else if loading {
                div { class: "empty-state py-12", "Loading profile..." }
            } else {
                div { class: "empty-state py-12",
                    p { "No active profile for this wallet." }
                }
            }
        }
    }
}
