//! Display rows for a single entity.

use serde::Serialize;
use serde_json::Value;

use crate::kek::{is_truthy, KekObject};
use crate::network::style::{shareholder_icon, type_icon};

/// How a field value is turned into text
#[derive(Debug, Clone, Copy)]
enum Format {
    Plain,
    /// Names of a list of objects, comma separated
    NameList,
    Percent,
    /// The `name` of an object
    Name,
    PlatformOperators,
    /// `fullName`, else `name`
    Authority,
}

/// Field labels in display order
const FIELDS: &[(&str, &str, Format)] = &[
    ("controlDate", "control date", Format::Plain),
    ("accessibilityEmail", "email", Format::Plain),
    ("accessibilityUrl", "url", Format::Plain),
    ("description", "description", Format::Plain),
    ("placeOfBusiness", "place of business", Format::Plain),
    ("pseudoCompany", "pseudo company ?", Format::Plain),
    ("supplierConsortium", "supplier consortium ?", Format::Plain),
    ("rfFreePay", "free ?", Format::Plain),
    ("rfPublicPrivate", "public ?", Format::Plain),
    ("rfShoppingChannel", "shopping channel ?", Format::Plain),
    ("rfStatewide", "statewide ?", Format::Plain),
    ("languages", "languages", Format::NameList),
    ("rfStartDate", "start date", Format::Plain),
    ("marketReach", "market reach", Format::Percent),
    ("matchedNames", "matched names", Format::Plain),
    ("onlineComments", "online comments", Format::Plain),
    ("onlineAGOF", "online (AGOF)", Format::Plain),
    ("onlineAsOfDateAGOF", "online since (AGOF)", Format::Plain),
    ("onlineAsOfDateIVW", "online since (IVW)", Format::Plain),
    ("onlineIVWPI", "online (IVWPI)", Format::Plain),
    ("onlineOfferType", "online offer type", Format::Name),
    ("onlineVisitsIVW", "online visits (IVW)", Format::Plain),
    ("platformOperators", "platform operators", Format::PlatformOperators),
    ("pressType", "press type", Format::Name),
    ("pressAsOfDate", "press as of date", Format::Plain),
    ("pressDistributionArea", "press distribution area", Format::Plain),
    ("pressEditionsComments", "press editions comments", Format::Plain),
    ("pressEditionsEpaper", "press editions ePaper", Format::Plain),
    ("pressEditionsIVW", "press editions (IVW) ?", Format::Plain),
    ("pressEditionsSold", "press editions sold", Format::Plain),
    ("pressKind", "press kind", Format::Plain),
    ("pressMagazineType", "press magazine type", Format::Name),
    ("pressPublishingIntervals", "press publishing intervals", Format::Plain),
    ("rfBroadcastStatus", "broadcast status", Format::Name),
    ("rfCategory", "category", Format::Name),
    ("rfDirector", "director", Format::Plain),
    ("rfLicensed", "license date", Format::Plain),
    ("rfLicenseFrom", "license from", Format::Plain),
    ("rfLicenseUntil", "license until", Format::Plain),
    ("rfParentalAdvisor", "parental advisor", Format::Plain),
    ("rfRepresentative", "representative", Format::Plain),
    ("rfSupervisingAuthority", "supervising authority", Format::Authority),
    ("sharesInfo", "shares info", Format::Plain),
    ("credits", "credits", Format::Plain),
];

/// One labelled value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRow {
    pub label: &'static str,
    pub value: String,
}

/// Everything shown for an entity in the detail panel
#[derive(Debug, Clone, Serialize)]
pub struct ObjectView {
    pub squuid: String,
    pub icon: &'static str,
    pub title: String,
    pub address: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_media_activities: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub fields: Vec<FieldRow>,
    /// The record pretty-printed
    pub raw: String,
}

impl From<&KekObject> for ObjectView {
    fn from(object: &KekObject) -> Self {
        let icon = match object.media_type() {
            Some(media_type) => type_icon(media_type),
            None => shareholder_icon(object.get("naturalPerson").map(is_truthy).unwrap_or(false)),
        };

        let fields = FIELDS
            .iter()
            .filter_map(|(key, label, format)| {
                let value = object.get(key)?;
                Some(FieldRow {
                    label: *label,
                    value: format_value(value, *format),
                })
            })
            .collect();

        let raw = serde_json::to_string_pretty(object.data()).unwrap_or_default();

        Self {
            squuid: object.squuid().to_string(),
            icon,
            title: format!("{} {}", icon, object.str_field("name").unwrap_or_else(|| object.name())),
            address: address_lines(object),
            other_media_activities: non_empty(object, "otherMediaActivities"),
            note: non_empty(object, "note"),
            fields,
            raw,
        }
    }
}

fn address_lines(object: &KekObject) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(name) = non_empty(object, "corporationName") {
        lines.push(name);
    }
    if let Some(co) = non_empty(object, "co") {
        lines.push(co);
    }
    if let Some(street) = non_empty(object, "street") {
        match non_empty(object, "streetNumber") {
            Some(number) => lines.push(format!("{} {}", street, number)),
            None => lines.push(street),
        }
    }
    if let Some(city) = non_empty(object, "city") {
        match non_empty(object, "zipcode") {
            Some(zipcode) => lines.push(format!("{} {}", zipcode, city)),
            None => lines.push(city),
        }
    }
    if let Some(rf_address) = non_empty(object, "rfAddress") {
        lines.extend(rf_address.lines().map(str::to_string));
    }
    lines
}

fn non_empty(object: &KekObject, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if s.is_empty() => None,
        Value::Null | Value::Bool(false) => None,
        value => Some(plain(value)),
    }
}

fn format_value(value: &Value, format: Format) -> String {
    let formatted = match format {
        Format::Plain => None,
        Format::NameList => value.as_array().map(|items| {
            items
                .iter()
                .map(|item| item.get("name").map(plain).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(", ")
        }),
        Format::Percent => value.as_f64().map(|v| format!("{:.3}%", v)),
        Format::Name => value.get("name").map(plain),
        Format::PlatformOperators => value.as_array().map(|items| {
            items
                .iter()
                .map(|item| {
                    let name = item.get("name").map(plain).unwrap_or_default();
                    let distribution = item
                        .get("distributionType")
                        .and_then(|d| d.get("name"))
                        .map(plain)
                        .unwrap_or_default();
                    format!("{} ({})", name, distribution)
                })
                .collect::<Vec<_>>()
                .join(", ")
        }),
        Format::Authority => value
            .get("fullName")
            .filter(|v| !matches!(v, Value::Null) && v.as_str() != Some(""))
            .or_else(|| value.get("name"))
            .map(plain),
    };
    formatted.unwrap_or_else(|| plain(value))
}

/// Strings without quotes, null as empty, everything else as JSON
fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
