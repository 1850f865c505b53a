use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fallback avatar shipped with the app, used whenever a profile carries no
/// usable picture.
pub const DEFAULT_AVATAR: &str = "/assets/default-avatar.svg";

/// Gateway used to turn `ipfs://` URIs into fetchable HTTP URLs. Consumers
/// rely on the exact host, so this is not interchangeable with other gateways.
pub const IPFS_GATEWAY: &str = "https://lens.infura-ipfs.io/ipfs/";

const IPFS_SCHEME: &str = "ipfs://";

/// A profile as returned by the social API. Owned by the protocol; the only
/// way to change one from here is through the metadata update operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub picture: Option<ProfilePicture>,
    #[serde(default)]
    pub cover_picture: Option<ProfilePicture>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeEntry>,
}

/// Pictures come back in two shapes depending on where they were set: a media
/// set with an `original.url`, or a bare `uri`. Either half may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProfilePicture {
    #[serde(default)]
    pub original: Option<Media>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Media {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttributeEntry {
    pub attribute: Attribute,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attribute {
    pub value: String,
}

/// Resolves the displayable URL for a profile's avatar. Total: anything
/// without a usable picture falls through to the bundled default.
pub fn resolve_picture_url(profile: &Profile) -> String {
    if let Some(picture) = &profile.picture {
        // An empty original url falls through to the uri branch.
        if let Some(original) = picture.original.as_ref().filter(|m| !m.url.is_empty()) {
            if let Some(cid) = original.url.strip_prefix(IPFS_SCHEME) {
                return format!("{}{}", IPFS_GATEWAY, cid);
            }
            return original.url.clone();
        }
        if let Some(uri) = picture.uri.as_ref().filter(|u| !u.is_empty()) {
            return uri.clone();
        }
    }
    DEFAULT_AVATAR.to_string()
}

/// Local, mutable mirror of the editable profile fields. Lives only as long
/// as the profile page is mounted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub name: String,
    pub bio: String,
    pub attributes: FormAttributes,
}

/// The six editable attributes. A struct rather than a map so the key set
/// can't drift.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormAttributes {
    pub location: String,
    pub website: String,
    pub twitter: String,
    pub instagram: String,
    pub github: String,
    pub linkedin: String,
}

impl FormAttributes {
    /// Pulls the six attribute values out of a freshly loaded profile,
    /// defaulting anything the profile doesn't carry to empty.
    pub fn from_profile(profile: &Profile) -> Self {
        let get = |key: &str| {
            profile
                .attributes
                .get(key)
                .map(|entry| entry.attribute.value.clone())
                .unwrap_or_default()
        };
        Self {
            location: get("location"),
            website: get("website"),
            twitter: get("twitter"),
            instagram: get("instagram"),
            github: get("github"),
            linkedin: get("linkedin"),
        }
    }
}

impl ProfileForm {
    /// Routes a single field edit: `name` and `bio` are top-level, the six
    /// attribute ids land in `attributes`, anything else is ignored.
    pub fn set_field(&mut self, id: &str, value: String) {
        match id {
            "name" => self.name = value,
            "bio" => self.bio = value,
            "location" => self.attributes.location = value,
            "website" => self.attributes.website = value,
            "twitter" => self.attributes.twitter = value,
            "instagram" => self.attributes.instagram = value,
            "github" => self.attributes.github = value,
            "linkedin" => self.attributes.linkedin = value,
            _ => {}
        }
    }
}

/// The update request handed to the social client. `cover_picture` is carried
/// over from the loaded profile untouched; the form never edits it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub name: String,
    pub bio: String,
    pub cover_picture: Option<ProfilePicture>,
    pub attributes: FormAttributes,
}

pub fn build_update_request(form: &ProfileForm, profile: &Profile) -> ProfileUpdateRequest {
    ProfileUpdateRequest {
        name: form.name.clone(),
        bio: form.bio.clone(),
        cover_picture: profile.cover_picture.clone(),
        attributes: form.attributes.clone(),
    }
}

/// The metadata blob persisted off-chain for an update. This is what the
/// funded uploader serializes and ships.
pub fn profile_metadata(request: &ProfileUpdateRequest) -> serde_json::Value {
    serde_json::json!({
        "version": "1.0.0",
        "name": request.name,
        "bio": request.bio,
        "coverPicture": request.cover_picture,
        "attributes": request.attributes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_profile() -> Profile {
        Profile {
            id: "0x01".to_string(),
            handle: "alice.test".to_string(),
            name: None,
            bio: None,
            picture: None,
            cover_picture: None,
            attributes: HashMap::new(),
        }
    }

    #[test]
    fn test_resolver_falls_back_without_picture() {
        let profile = bare_profile();
        assert_eq!(resolve_picture_url(&profile), DEFAULT_AVATAR);
    }

    #[test]
    fn test_resolver_falls_back_with_empty_variant() {
        let mut profile = bare_profile();
        profile.picture = Some(ProfilePicture::default());
        assert_eq!(resolve_picture_url(&profile), DEFAULT_AVATAR);
    }

    #[test]
    fn test_resolver_falls_through_empty_original_url() {
        let mut profile = bare_profile();
        profile.picture = Some(ProfilePicture {
            original: Some(Media {
                url: String::new(),
            }),
            uri: Some("https://img.example.com/c.png".to_string()),
        });
        assert_eq!(resolve_picture_url(&profile), "https://img.example.com/c.png");

        profile.picture = Some(ProfilePicture {
            original: Some(Media {
                url: String::new(),
            }),
            uri: None,
        });
        assert_eq!(resolve_picture_url(&profile), DEFAULT_AVATAR);
    }

    #[test]
    fn test_resolver_never_returns_empty() {
        let mut profile = bare_profile();
        profile.picture = Some(ProfilePicture {
            original: Some(Media {
                url: String::new(),
            }),
            uri: Some(String::new()),
        });
        assert_eq!(resolve_picture_url(&profile), DEFAULT_AVATAR);
    }

    #[test]
    fn test_resolver_rewrites_ipfs_uris() {
        assert_eq!(IPFS_GATEWAY, "https://lens.infura-ipfs.io/ipfs/");

        let mut profile = bare_profile();
        profile.picture = Some(ProfilePicture {
            original: Some(Media {
                url: "ipfs://QmAvatarCid".to_string(),
            }),
            uri: None,
        });
        assert_eq!(
            resolve_picture_url(&profile),
            format!("{}QmAvatarCid", IPFS_GATEWAY)
        );
    }

    #[test]
    fn test_resolver_passes_http_urls_through() {
        let mut profile = bare_profile();
        profile.picture = Some(ProfilePicture {
            original: Some(Media {
                url: "https://cdn.example.com/a.png".to_string(),
            }),
            uri: None,
        });
        assert_eq!(resolve_picture_url(&profile), "https://cdn.example.com/a.png");
    }

    #[test]
    fn test_resolver_uses_uri_variant() {
        let mut profile = bare_profile();
        profile.picture = Some(ProfilePicture {
            original: None,
            uri: Some("https://img.example.com/b.png".to_string()),
        });
        assert_eq!(resolve_picture_url(&profile), "https://img.example.com/b.png");
    }

    #[test]
    fn test_attributes_reconcile_with_defaults() {
        let mut profile = bare_profile();
        profile.attributes.insert(
            "location".to_string(),
            AttributeEntry {
                attribute: Attribute {
                    value: "NYC".to_string(),
                },
            },
        );

        let attrs = FormAttributes::from_profile(&profile);
        assert_eq!(
            attrs,
            FormAttributes {
                location: "NYC".to_string(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_set_field_routes_edits() {
        let mut form = ProfileForm::default();
        form.set_field("name", "Alice".to_string());
        form.set_field("bio", "hi".to_string());
        form.set_field("twitter", "alice".to_string());
        form.set_field("favorite_color", "purple".to_string());

        assert_eq!(form.name, "Alice");
        assert_eq!(form.bio, "hi");
        assert_eq!(form.attributes.twitter, "alice");
        assert_eq!(form.attributes.location, "");
    }

    #[test]
    fn test_update_request_carries_cover_picture() {
        let mut profile = bare_profile();
        let cover = ProfilePicture {
            original: Some(Media {
                url: "https://cdn.example.com/cover.png".to_string(),
            }),
            uri: None,
        };
        profile.cover_picture = Some(cover.clone());

        let mut form = ProfileForm::default();
        form.set_field("name", "Alice".to_string());
        form.set_field("bio", "hi".to_string());

        let request = build_update_request(&form, &profile);
        assert_eq!(request.name, "Alice");
        assert_eq!(request.bio, "hi");
        assert_eq!(request.cover_picture, Some(cover));
        assert_eq!(request.attributes, form.attributes);

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("coverPicture").is_some());
    }
}
