use crate::{DisplayName, OrganizationList, ServerList, ServerType};

const ORGANIZATIONS: &str = r#"{
    "v": 1700000000,
    "organization_list": [
        {
            "display_name": {"en": "SURF", "nl": "SURF NL"},
            "org_id": "https://idp.surf.nl",
            "secure_internet_home": "https://nl.eduvpn.org/",
            "keyword_list": {"en": "surfnet amsterdam"}
        },
        {
            "display_name": "Plain University",
            "org_id": "https://idp.plain.example",
            "secure_internet_home": "https://de.eduvpn.org/"
        }
    ]
}"#;

const SERVERS: &str = r#"{
    "v": 1700000001,
    "server_list": [
        {
            "base_url": "https://nl.eduvpn.org/",
            "country_code": "NL",
            "public_key_list": ["RWRtBSX1alxyGX+Xn3LuZnWUT0w//B6EmTJvgaAxBMYzlQeI+jdrO6KF"],
            "server_type": "secure_internet",
            "support_contact": ["mailto:help@example.org"]
        },
        {
            "base_url": "https://de.eduvpn.org",
            "country_code": "DE",
            "server_type": "secure_internet"
        },
        {
            "base_url": "https://vpn.institute.example/",
            "display_name": {"en-US": "Institute", "de": "Institut"},
            "server_type": "institute_access"
        }
    ]
}"#;

/// **VALUE**: Verifies both shapes of discovery display names deserialize.
///
/// **WHY THIS MATTERS**: The discovery documents mix plain strings and locale maps.
/// A single unparseable entry would make the whole list unusable.
///
/// **BUG THIS CATCHES**: Would catch if the untagged enum is replaced by a plain String.
#[test]
fn given_organization_document_when_parsing_then_string_and_map_names_accepted() {
    // GIVEN/WHEN
    let organizations: OrganizationList = serde_json::from_str(ORGANIZATIONS).unwrap();

    // THEN
    assert_eq!(organizations.version, 1_700_000_000);
    assert_eq!(organizations.fetched_at, 0);
    let surf = organizations.find("https://idp.surf.nl").unwrap();
    assert_eq!(surf.display_name.localized("nl-NL"), "SURF NL");
    let plain = organizations.find("https://idp.plain.example").unwrap();
    assert_eq!(plain.display_name.localized("nl"), "Plain University");
}

#[test]
fn given_keyword_when_searching_organizations_then_matches_keywords_and_names() {
    let organizations: OrganizationList = serde_json::from_str(ORGANIZATIONS).unwrap();

    let by_keyword = organizations.search("AMSTERDAM");
    let by_name = organizations.search("plain");

    assert_eq!(by_keyword.len(), 1);
    assert_eq!(by_keyword[0].org_id, "https://idp.surf.nl");
    assert_eq!(by_name.len(), 1);
}

#[test]
fn given_server_document_when_querying_then_locations_and_lookups_work() {
    // GIVEN
    let servers: ServerList = serde_json::from_str(SERVERS).unwrap();

    // WHEN/THEN: Locations only list secure internet servers
    assert_eq!(servers.secure_internet_locations(), vec!["NL", "DE"]);
    assert_eq!(
        servers.by_country("de").unwrap().base_url,
        "https://de.eduvpn.org"
    );
    let institute = servers.by_base_url("https://vpn.institute.example").unwrap();
    assert_eq!(institute.server_type, ServerType::InstituteAccess);
    assert_eq!(
        institute.display_name.as_ref().unwrap().localized("fr"),
        "Institute"
    );
}

#[test]
fn given_locale_map_without_match_when_localizing_then_falls_back_to_first_entry() {
    let name = DisplayName::Localized(
        [(String::from("fr"), String::from("Nom"))]
            .into_iter()
            .collect(),
    );

    assert_eq!(name.localized("de"), "Nom");
    assert_eq!(DisplayName::default().localized("en"), "");
}
