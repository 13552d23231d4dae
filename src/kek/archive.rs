//! The complete archive: every media outlet and shareholder, keyed by squuid.

use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Write as _;

use super::client::{ApiClient, CachingMode};
use super::object::{KekObject, Relation};
use super::pattern::Pattern;
use crate::error::{KekError, Result};

/// The two entity collections of the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Media,
    Shareholders,
}

impl Collection {
    /// API path and cache directory name
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Media => "media",
            Collection::Shareholders => "shareholders",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "media" => Some(Collection::Media),
            "shareholders" => Some(Collection::Shareholders),
            _ => None,
        }
    }

    /// Cache file of one entity, relative to the data directory
    pub fn entity_file(&self, squuid: &str) -> String {
        format!("{}/{}.json", self.name(), squuid)
    }
}

/// Direction for [`Kek::dump_tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeDirection {
    /// Towards operators and owners
    Up,
    /// Towards operated media and holdings
    Down,
}

impl std::str::FromStr for TreeDirection {
    type Err = KekError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(TreeDirection::Up),
            "down" => Ok(TreeDirection::Down),
            other => Err(KekError::InvalidInput(format!(
                "Try direction 'up' or 'down', not '{}'",
                other
            ))),
        }
    }
}

/// Effective share of one upstream holder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerShare {
    pub squuid: String,
    pub name: String,
    pub percent: f64,
}

/// Media-ownership archive
#[derive(Debug, Default)]
pub struct Kek {
    medias: Vec<KekObject>,
    holders: Vec<KekObject>,
    media_index: HashMap<String, usize>,
    holder_index: HashMap<String, usize>,
}

impl Kek {
    /// Build an archive from already loaded records, keeping their order.
    pub fn from_objects(medias: Vec<KekObject>, holders: Vec<KekObject>) -> Self {
        let media_index = index_of(&medias);
        let holder_index = index_of(&holders);
        Self {
            medias,
            holders,
            media_index,
            holder_index,
        }
    }

    /// Load (and, depending on `caching`, download) the whole archive.
    ///
    /// The first call against an empty data directory bootstraps every file
    /// and takes a few minutes.
    pub async fn load(client: &ApiClient, caching: CachingMode, concurrency: usize) -> Result<Self> {
        let medias = load_collection(client, Collection::Media, caching, concurrency).await?;
        let holders = load_collection(client, Collection::Shareholders, caching, concurrency).await?;
        log::info!("loaded {} media, {} shareholders", medias.len(), holders.len());
        Ok(Self::from_objects(medias, holders))
    }

    pub fn medias(&self) -> &[KekObject] {
        &self.medias
    }

    pub fn holders(&self) -> &[KekObject] {
        &self.holders
    }

    pub fn len(&self) -> usize {
        self.medias.len() + self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medias.is_empty() && self.holders.is_empty()
    }

    /// Look up an entity, media first
    pub fn get(&self, squuid: &str) -> Option<&KekObject> {
        self.media_index
            .get(squuid)
            .map(|&i| &self.medias[i])
            .or_else(|| self.holder_index.get(squuid).map(|&i| &self.holders[i]))
    }

    /// Which collection an entity lives in
    pub fn collection_of(&self, squuid: &str) -> Option<Collection> {
        if self.media_index.contains_key(squuid) {
            Some(Collection::Media)
        } else if self.holder_index.contains_key(squuid) {
            Some(Collection::Shareholders)
        } else {
            None
        }
    }

    pub fn filter_media<'a>(&'a self, filters: &'a [(String, Pattern)]) -> impl Iterator<Item = &'a KekObject> + 'a {
        filter_records(&self.medias, filters)
    }

    pub fn filter_holder<'a>(&'a self, filters: &'a [(String, Pattern)]) -> impl Iterator<Item = &'a KekObject> + 'a {
        filter_records(&self.holders, filters)
    }

    /// First matching media; the result does not borrow `filters`.
    pub fn find_media(&self, filters: &[(String, Pattern)]) -> Option<&KekObject> {
        self.medias.iter().find(|record| record_matches(record, filters))
    }

    pub fn find_holder(&self, filters: &[(String, Pattern)]) -> Option<&KekObject> {
        self.holders.iter().find(|record| record_matches(record, filters))
    }

    /// Look up by squuid, else the first media or shareholder whose name
    /// matches the shell pattern `query`.
    pub fn resolve(&self, query: &str) -> Result<Option<&KekObject>> {
        if let Some(object) = self.get(query) {
            return Ok(Some(object));
        }
        let filters = vec![("name".to_string(), Pattern::new(query)?)];
        Ok(self.find_media(&filters).or_else(|| self.find_holder(&filters)))
    }

    /// All top-level field names of media and of shareholders
    pub fn field_names(&self) -> (BTreeSet<String>, BTreeSet<String>) {
        let collect = |records: &[KekObject]| {
            records
                .iter()
                .flat_map(|r| r.keys().cloned())
                .collect::<BTreeSet<_>>()
        };
        (collect(&self.medias), collect(&self.holders))
    }

    /// Effective shares of every upstream holder of `object`, in percent.
    ///
    /// Media start from their operators at 100%, shareholders from their
    /// direct owners. Shares multiply along ownership chains; every
    /// holder->owner edge is followed at most once so cycles terminate.
    pub fn top_owners(&self, object: &KekObject) -> Vec<OwnerShare> {
        let mut pending: VecDeque<String> = VecDeque::new();
        let mut open: HashMap<String, f64> = HashMap::new();
        let mut names: HashMap<String, String> = HashMap::new();

        let start: Vec<(Relation, f64)> = if object.is_media() {
            object.operators().into_iter().map(|r| (r, 1.0)).collect()
        } else {
            object
                .owners()
                .into_iter()
                .map(|r| {
                    let share = r.shares.unwrap_or(0.0) / 100.0;
                    (r, share)
                })
                .collect()
        };
        for (rel, share) in start {
            push_open(&mut pending, &mut open, &rel.squuid, share);
            names.entry(rel.squuid.clone()).or_insert(rel.name);
        }

        let mut histogram: HashMap<String, f64> = HashMap::new();
        let mut done: HashSet<(String, String)> = HashSet::new();

        while let Some(holder) = pending.pop_front() {
            let Some(share) = open.remove(&holder) else {
                continue;
            };
            *histogram.entry(holder.clone()).or_insert(0.0) += share;

            let Some(holder_obj) = self.get(&holder) else {
                continue;
            };
            for owner in holder_obj.owners() {
                let edge = (holder.clone(), owner.squuid.clone());
                if !done.contains(&edge) {
                    let percent = owner.shares.unwrap_or(0.0);
                    push_open(&mut pending, &mut open, &owner.squuid, share * percent / 100.0);
                }
                names.entry(owner.squuid.clone()).or_insert_with(|| owner.name.clone());
                done.insert(edge);
            }
        }

        let mut result: Vec<OwnerShare> = histogram
            .into_iter()
            .map(|(squuid, value)| {
                let name = self
                    .get(&squuid)
                    .map(|o| o.name().to_string())
                    .or_else(|| names.get(&squuid).cloned())
                    .unwrap_or_default();
                OwnerShare {
                    squuid,
                    name,
                    percent: value * 100.0,
                }
            })
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        result.sort_by(|a, b| b.percent.total_cmp(&a.percent));
        result
    }

    /// Render the ownership tree above or below `object` with box-drawing prefixes.
    pub fn dump_tree(&self, object: &KekObject, direction: TreeDirection) -> String {
        let mut out = String::new();
        let mut seen = HashSet::new();
        self.dump_node(object, direction, "", "", &mut out, &mut seen);
        out
    }

    fn dump_node(
        &self,
        object: &KekObject,
        direction: TreeDirection,
        prefix: &str,
        share_prefix: &str,
        out: &mut String,
        seen: &mut HashSet<String>,
    ) {
        let mut label = object.name().to_string();
        if let Some(kind) = object.media_type() {
            label = format!("({}) {}", kind, label);
        }
        let _ = writeln!(out, "{}{}{}", prefix, share_prefix, label);

        let prefix = prefix.replace('└', " ").replace('─', " ").replace('├', "│");

        let (mut branches, with_shares) = match direction {
            TreeDirection::Up => {
                let operators = object.operators();
                if operators.is_empty() {
                    (object.owners(), true)
                } else {
                    (operators, false)
                }
            }
            TreeDirection::Down => {
                let operates = object.operates();
                if operates.is_empty() {
                    (object.owns(), true)
                } else {
                    (operates, false)
                }
            }
        };

        if with_shares {
            branches.sort_by(|a, b| b.shares.unwrap_or(0.0).total_cmp(&a.shares.unwrap_or(0.0)));
        } else {
            branches.sort_by(|a, b| self.branch_name(a).cmp(self.branch_name(b)));
        }

        if seen.contains(object.squuid()) {
            if !branches.is_empty() {
                let _ = writeln!(out, "{}└─...", prefix);
                return;
            }
        }
        seen.insert(object.squuid().to_string());

        let last = branches.len().saturating_sub(1);
        for (i, branch) in branches.iter().enumerate() {
            let share_prefix = if with_shares {
                format!("{} ", format_share(branch.shares.unwrap_or(0.0)))
            } else {
                String::new()
            };
            let next_prefix = if i == last { "└─" } else { "├─" };
            let child_prefix = format!("{}{}", prefix, next_prefix);

            match self.get(&branch.squuid) {
                Some(child) => {
                    self.dump_node(child, direction, &child_prefix, &share_prefix, out, seen);
                }
                None => {
                    let _ = writeln!(out, "{}{}{}", child_prefix, share_prefix, branch.name);
                }
            }
        }
    }

    fn branch_name<'a>(&'a self, rel: &'a Relation) -> &'a str {
        self.get(&rel.squuid).map(|o| o.name()).unwrap_or(&rel.name)
    }
}

fn index_of(records: &[KekObject]) -> HashMap<String, usize> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| (r.squuid().to_string(), i))
        .collect()
}

fn push_open(pending: &mut VecDeque<String>, open: &mut HashMap<String, f64>, squuid: &str, share: f64) {
    match open.get_mut(squuid) {
        Some(value) => *value += share,
        None => {
            open.insert(squuid.to_string(), share);
            pending.push_back(squuid.to_string());
        }
    }
}

fn format_share(share: f64) -> String {
    if share.fract() == 0.0 {
        format!("{}", share as i64)
    } else {
        format!("{}", share)
    }
}

fn filter_records<'a>(
    records: &'a [KekObject],
    filters: &'a [(String, Pattern)],
) -> impl Iterator<Item = &'a KekObject> + 'a {
    records.iter().filter(move |record| record_matches(record, filters))
}

/// Whether the cached file of an entity may be used, given its `controlDate`
/// in the previous and the current list.
fn entity_uses_cache(caching: CachingMode, previous_date: Option<&str>, date: Option<&str>) -> bool {
    match caching {
        CachingMode::Always => true,
        CachingMode::Never => false,
        // entities new to the list or undated before keep their cached file
        CachingMode::Upgrade => previous_date.map_or(true, |previous| date == Some(previous)),
    }
}

/// Every field's string value (missing is `""`) matches its pattern.
fn record_matches(record: &KekObject, filters: &[(String, Pattern)]) -> bool {
    filters
        .iter()
        .all(|(field, pattern)| pattern.is_match(record.str_field(field).unwrap_or("")))
}

/// Parse `field=pattern` filter arguments
pub fn parse_filters(args: &[String]) -> Result<Vec<(String, Pattern)>> {
    args.iter()
        .map(|arg| {
            let (field, pattern) = arg
                .split_once('=')
                .ok_or_else(|| KekError::InvalidInput(format!("expected field=pattern, got '{}'", arg)))?;
            Ok((field.to_string(), Pattern::new(pattern)?))
        })
        .collect()
}

async fn load_collection(
    client: &ApiClient,
    collection: Collection,
    caching: CachingMode,
    concurrency: usize,
) -> Result<Vec<KekObject>> {
    let name = collection.name();
    let list_file = format!("{}.json", name);

    let previous_dates: HashMap<String, String> = if caching == CachingMode::Upgrade {
        match client.read_cached(&list_file).await? {
            Some(Value::Array(previous)) => previous
                .iter()
                .filter_map(|e| {
                    let squuid = e.get("squuid")?.as_str()?;
                    let date = e.get("controlDate")?.as_str()?;
                    Some((squuid.to_string(), date.to_string()))
                })
                .collect(),
            _ => HashMap::new(),
        }
    } else {
        HashMap::new()
    };

    let list = client
        .download(&format!("{}/", name), &list_file, caching == CachingMode::Always)
        .await?;
    let Value::Array(entries) = list else {
        return Err(KekError::Parse(format!("{} is not a JSON list", list_file)));
    };

    let jobs: Vec<(String, bool)> = entries
        .iter()
        .map(|e| {
            let squuid = e
                .get("squuid")
                .and_then(Value::as_str)
                .ok_or_else(|| KekError::Parse(format!("entry without squuid in {}", list_file)))?
                .to_string();
            let use_cache = entity_uses_cache(
                caching,
                previous_dates.get(&squuid).map(String::as_str),
                e.get("controlDate").and_then(Value::as_str),
            );
            Ok((squuid, use_cache))
        })
        .collect::<Result<_>>()?;

    log::info!("{}: {} entries", name, jobs.len());

    stream::iter(jobs)
        .map(|(squuid, use_cache)| async move {
            let data = client
                .download(
                    &format!("{}/{}", name, squuid),
                    &collection.entity_file(&squuid),
                    use_cache,
                )
                .await?;
            KekObject::new(data)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use reqwest::Client;
    use serde_json::json;
    use tempfile::TempDir;

    /// Small archive:
    ///
    /// ```text
    /// fam --60--> hold --100--> radio_gmbh --operates--> radio
    /// bank --40--> hold
    /// hold --50--> verlag --operates--> zeitung
    /// ```
    pub(crate) fn sample_kek() -> Kek {
        let obj = |v: Value| KekObject::new(v).unwrap();
        let medias = vec![
            obj(json!({
                "squuid": "m-radio", "name": "Radio Eins", "type": "radio",
                "state": {"name": "Berlin"},
                "operatedBy": [{"holder": {"squuid": "h-radio", "name": "Radio GmbH"}}]
            })),
            obj(json!({
                "squuid": "m-zeitung", "name": "Tageszeitung", "type": "print",
                "state": {"name": "Bayern"},
                "operatedBy": [{"holder": {"squuid": "h-verlag", "name": "Verlag"}}]
            })),
        ];
        let holders = vec![
            obj(json!({
                "squuid": "h-fam", "name": "Familie", "naturalPerson": true,
                "owns": [{"held": {"squuid": "h-hold", "name": "Holding"}, "capitalShares": 60}]
            })),
            obj(json!({
                "squuid": "h-bank", "name": "Bank",
                "owns": [{"held": {"squuid": "h-hold", "name": "Holding"}, "capitalShares": 40}]
            })),
            obj(json!({
                "squuid": "h-hold", "name": "Holding",
                "ownedBy": [
                    {"holder": {"squuid": "h-fam", "name": "Familie"}, "capitalShares": 60},
                    {"holder": {"squuid": "h-bank", "name": "Bank"}, "capitalShares": 40}
                ],
                "owns": [
                    {"held": {"squuid": "h-radio", "name": "Radio GmbH"}, "capitalShares": 100},
                    {"held": {"squuid": "h-verlag", "name": "Verlag"}, "capitalShares": 50}
                ]
            })),
            obj(json!({
                "squuid": "h-radio", "name": "Radio GmbH",
                "ownedBy": [{"holder": {"squuid": "h-hold", "name": "Holding"}, "capitalShares": 100}],
                "operates": [{"held": {"squuid": "m-radio", "name": "Radio Eins"}}]
            })),
            obj(json!({
                "squuid": "h-verlag", "name": "Verlag",
                "ownedBy": [{"holder": {"squuid": "h-hold", "name": "Holding"}, "capitalShares": 50}],
                "operates": [{"held": {"squuid": "m-zeitung", "name": "Tageszeitung"}}]
            })),
        ];
        Kek::from_objects(medias, holders)
    }

    #[test]
    fn test_get_and_collection() {
        let kek = sample_kek();
        assert_eq!(kek.len(), 7);
        assert_eq!(kek.get("m-radio").unwrap().name(), "Radio Eins");
        assert_eq!(kek.get("h-bank").unwrap().name(), "Bank");
        assert!(kek.get("nope").is_none());
        assert_eq!(kek.collection_of("m-radio"), Some(Collection::Media));
        assert_eq!(kek.collection_of("h-bank"), Some(Collection::Shareholders));
        assert_eq!(Collection::Media.entity_file("x"), "media/x.json");
    }

    #[test]
    fn test_filter_and_find() {
        let kek = sample_kek();
        let filters = parse_filters(&["name=*GmbH".to_string()]).unwrap();
        let found: Vec<_> = kek.filter_holder(&filters).map(|o| o.squuid()).collect();
        assert_eq!(found, vec!["h-radio"]);

        let filters = parse_filters(&["type=print".to_string()]).unwrap();
        assert_eq!(kek.find_media(&filters).unwrap().squuid(), "m-zeitung");

        let filters = parse_filters(&["missing=*".to_string()]).unwrap();
        assert_eq!(kek.filter_holder(&filters).count(), 5);

        assert!(parse_filters(&["noequals".to_string()]).is_err());
    }

    #[test]
    fn test_find_result_outlives_filters() {
        let kek = sample_kek();
        let found = {
            let filters = parse_filters(&["name=Radio*".to_string()]).unwrap();
            kek.find_media(&filters)
        };
        assert_eq!(found.unwrap().squuid(), "m-radio");
        let holder = {
            let filters = parse_filters(&["name=Bank".to_string()]).unwrap();
            kek.find_holder(&filters)
        };
        assert_eq!(holder.unwrap().squuid(), "h-bank");
    }

    #[test]
    fn test_resolve_by_squuid_or_name() {
        let kek = sample_kek();
        assert_eq!(kek.resolve("h-bank").unwrap().unwrap().name(), "Bank");
        assert_eq!(kek.resolve("Radio*").unwrap().unwrap().squuid(), "m-radio");
        assert_eq!(kek.resolve("Hold?ng").unwrap().unwrap().squuid(), "h-hold");
        assert!(kek.resolve("Nobody").unwrap().is_none());
    }

    #[test]
    fn test_field_names() {
        let kek = sample_kek();
        let (media_keys, holder_keys) = kek.field_names();
        assert!(media_keys.contains("operatedBy"));
        assert!(media_keys.contains("type"));
        assert!(holder_keys.contains("naturalPerson"));
        assert!(!holder_keys.contains("type"));
    }

    #[test]
    fn test_top_owners_of_media() {
        let kek = sample_kek();
        let owners = kek.top_owners(kek.get("m-zeitung").unwrap());
        let by_squuid: HashMap<_, _> = owners.iter().map(|o| (o.squuid.as_str(), o.percent)).collect();
        assert!((by_squuid["h-verlag"] - 100.0).abs() < 1e-9);
        assert!((by_squuid["h-hold"] - 50.0).abs() < 1e-9);
        assert!((by_squuid["h-fam"] - 30.0).abs() < 1e-9);
        assert!((by_squuid["h-bank"] - 20.0).abs() < 1e-9);
        assert_eq!(owners[0].squuid, "h-verlag");
        assert_eq!(owners.last().unwrap().squuid, "h-bank");
    }

    #[test]
    fn test_top_owners_of_shareholder() {
        let kek = sample_kek();
        let owners = kek.top_owners(kek.get("h-hold").unwrap());
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].name, "Familie");
        assert!((owners[0].percent - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_owners_cycle_terminates() {
        let obj = |v: Value| KekObject::new(v).unwrap();
        let kek = Kek::from_objects(
            vec![],
            vec![
                obj(json!({"squuid": "a", "name": "A",
                    "ownedBy": [{"holder": {"squuid": "b", "name": "B"}, "capitalShares": 50}]})),
                obj(json!({"squuid": "b", "name": "B",
                    "ownedBy": [{"holder": {"squuid": "a", "name": "A"}, "capitalShares": 50}]})),
            ],
        );
        let owners = kek.top_owners(kek.get("a").unwrap());
        assert_eq!(owners.len(), 2);
    }

    #[test]
    fn test_dump_tree_up() {
        let kek = sample_kek();
        let tree = kek.dump_tree(kek.get("m-radio").unwrap(), TreeDirection::Up);
        let expected = "\
(radio) Radio Eins
└─Radio GmbH
  └─100 Holding
    ├─60 Familie
    └─40 Bank
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_dump_tree_down_marks_repeats() {
        let obj = |v: Value| KekObject::new(v).unwrap();
        let kek = Kek::from_objects(
            vec![],
            vec![
                obj(json!({"squuid": "a", "name": "A",
                    "owns": [{"held": {"squuid": "b", "name": "B"}, "capitalShares": 10}]})),
                obj(json!({"squuid": "b", "name": "B",
                    "owns": [{"held": {"squuid": "a", "name": "A"}, "capitalShares": 20}]})),
            ],
        );
        let tree = kek.dump_tree(kek.get("a").unwrap(), TreeDirection::Down);
        let expected = "\
A
└─10 B
  └─20 A
    └─...
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn test_tree_direction_parse() {
        assert_eq!("up".parse::<TreeDirection>().unwrap(), TreeDirection::Up);
        assert!("sideways".parse::<TreeDirection>().is_err());
    }

    #[tokio::test]
    async fn test_load_from_cache() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        std::fs::create_dir_all(dir.join("media")).unwrap();
        std::fs::create_dir_all(dir.join("shareholders")).unwrap();
        std::fs::write(dir.join("media.json"), r#"[{"squuid": "m1"}]"#).unwrap();
        std::fs::write(dir.join("shareholders.json"), r#"[{"squuid": "h1"}, {"squuid": "h2"}]"#).unwrap();
        std::fs::write(
            dir.join("media/m1.json"),
            r#"{"squuid": "m1", "name": "M", "type": "tv", "operatedBy": []}"#,
        )
        .unwrap();
        std::fs::write(dir.join("shareholders/h1.json"), r#"{"squuid": "h1", "name": "H1"}"#).unwrap();
        std::fs::write(dir.join("shareholders/h2.json"), r#"{"squuid": "h2", "name": "H2"}"#).unwrap();

        let client = ApiClient::with_client(Client::new(), "http://127.0.0.1:9/", dir).unwrap();
        let kek = Kek::load(&client, CachingMode::Always, 2).await.unwrap();
        assert_eq!(kek.medias().len(), 1);
        let names: Vec<_> = kek.holders().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["H1", "H2"]);
    }

    #[test]
    fn test_entity_uses_cache() {
        assert!(entity_uses_cache(CachingMode::Always, Some("2020"), Some("2021")));
        assert!(!entity_uses_cache(CachingMode::Never, Some("2020"), Some("2020")));

        let upgrade = CachingMode::Upgrade;
        assert!(entity_uses_cache(upgrade, Some("2020"), Some("2020")));
        assert!(!entity_uses_cache(upgrade, Some("2020"), Some("2021")));
        assert!(!entity_uses_cache(upgrade, Some("2020"), None));
        // not in the previous list, or listed without a date
        assert!(entity_uses_cache(upgrade, None, Some("2021")));
        assert!(entity_uses_cache(upgrade, None, None));
    }

    /// Serve `media/`, `media/:squuid` and an empty `shareholders/` list.
    async fn serve_api(media_list: Value) -> String {
        use axum::extract::Path;
        use axum::routing::get;
        use axum::{Json, Router};

        let app = Router::new()
            .route(
                "/media/",
                get(move || {
                    let list = media_list.clone();
                    async move { Json(list) }
                }),
            )
            .route(
                "/media/:squuid",
                get(|Path(squuid): Path<String>| async move {
                    Json(json!({"squuid": squuid, "name": "fresh", "type": "tv", "operatedBy": []}))
                }),
            )
            .route("/shareholders/", get(|| async { Json(json!([])) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_upgrade_refreshes_changed_entities() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        std::fs::create_dir_all(dir.join("media")).unwrap();
        std::fs::write(
            dir.join("media.json"),
            r#"[{"squuid": "m1", "controlDate": "2020"}, {"squuid": "m2", "controlDate": "2020"}, {"squuid": "m3"}]"#,
        )
        .unwrap();
        for squuid in ["m1", "m2", "m3"] {
            std::fs::write(
                dir.join(format!("media/{}.json", squuid)),
                format!(r#"{{"squuid": "{}", "name": "cached", "type": "tv", "operatedBy": []}}"#, squuid),
            )
            .unwrap();
        }

        let api_url = serve_api(json!([
            {"squuid": "m1", "controlDate": "2020"},
            {"squuid": "m2", "controlDate": "2021"},
            {"squuid": "m3", "controlDate": "2021"},
            {"squuid": "m4", "controlDate": "2021"}
        ]))
        .await;
        let client = ApiClient::with_client(Client::new(), &api_url, dir).unwrap();
        let kek = Kek::load(&client, CachingMode::Upgrade, 2).await.unwrap();

        let names: Vec<_> = kek.medias().iter().map(|m| (m.squuid(), m.name())).collect();
        assert_eq!(
            names,
            vec![("m1", "cached"), ("m2", "fresh"), ("m3", "cached"), ("m4", "fresh")]
        );
        // the list itself is always fetched again
        let list = std::fs::read_to_string(dir.join("media.json")).unwrap();
        assert!(list.contains("m4"));
        let m2 = std::fs::read_to_string(dir.join("media/m2.json")).unwrap();
        assert!(m2.contains("fresh"));
    }
}
