//! API command wrappers.
//!
//! Each method builds a [`Request`], sends it through the client's
//! [`Transport`], and extracts records from the response with a catalogue
//! schema. Case operations (`search`, `new`, the edit family) take the case
//! schema from the caller and apply the client's name remap; the catalogue
//! objects use their wire names unchanged.

use std::collections::BTreeSet;

use fbmap_typemap::util::comma_or_space_split;
use fbmap_typemap::{
    NameMap, Record, Schema, SortBy, Value, WireArgs, column_list, extract, extract_all,
    parse_document, to_wire_args,
};

use crate::error::{CommandError, Result};
use crate::schemas::{
    FB_AREA, FB_BUG_IXBUG, FB_CATEGORY, FB_ERROR, FB_FILTER, FB_FIX_FOR, FB_PERSON, FB_PRIORITY,
    FB_PROJECT, FB_STATUS, FB_TAG,
};
use crate::transport::{Request, Transport};

const CUSTOM_FIELDS_COLUMN: &str = "plugin_customfields";

/// Sort order for list commands without filters.
///
/// `sort_by: None` uses the command's default order; `Some(SortBy::none())`
/// keeps the response order.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub sort_by: Option<SortBy>,
}

impl ListOptions {
    /// Options overriding the default sort.
    pub fn sorted(sort_by: impl Into<SortBy>) -> Self {
        Self {
            sort_by: Some(sort_by.into()),
        }
    }
}

/// `listProjects` filters. Sorted by `(ixProject, ixArea)` unless overridden.
#[derive(Debug, Clone, Default)]
pub struct ListProjects {
    pub ix_project: Option<i64>,
    pub write: bool,
    pub include_deleted: bool,
    pub sort_by: Option<SortBy>,
}

/// `listAreas` filters. Sorted by `(ixProject, ixArea)` unless overridden.
#[derive(Debug, Clone, Default)]
pub struct ListAreas {
    pub ix_project: Option<i64>,
    pub ix_area: Option<i64>,
    pub write: bool,
    pub sort_by: Option<SortBy>,
}

/// `listPeople` filters.
///
/// The include flags are sent only when set; the API applies its own
/// defaults for the rest.
#[derive(Debug, Clone, Default)]
pub struct ListPeople {
    pub include_deleted: Option<bool>,
    pub include_virtual: Option<bool>,
    pub include_normal: Option<bool>,
    pub include_active: Option<bool>,
    pub include_community: Option<bool>,
    pub sort_by: Option<SortBy>,
}

/// `listStatuses` filters. Sorted by `(ixCategory, iOrder)` unless overridden.
#[derive(Debug, Clone, Default)]
pub struct ListStatuses {
    pub ix_category: Option<i64>,
    pub resolved: bool,
    pub sort_by: Option<SortBy>,
}

/// `listFixFors` filters. Sorted by `ixProject` unless overridden.
#[derive(Debug, Clone, Default)]
pub struct ListFixFors {
    pub ix_project: Option<i64>,
    pub ix_fix_for: Option<i64>,
    pub include_deleted: bool,
    pub include_really_deleted: bool,
    pub sort_by: Option<SortBy>,
}

/// The filter `setCurrentFilter` should switch to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterSelector {
    Id(i64),
    Name(String),
}

impl FilterSelector {
    fn wire_value(&self) -> String {
        match self {
            FilterSelector::Id(id) => id.to_string(),
            FilterSelector::Name(name) => name.clone(),
        }
    }
}

impl From<i64> for FilterSelector {
    fn from(id: i64) -> Self {
        FilterSelector::Id(id)
    }
}

impl From<&str> for FilterSelector {
    fn from(name: &str) -> Self {
        FilterSelector::Name(name.to_string())
    }
}

impl From<String> for FilterSelector {
    fn from(name: String) -> Self {
        FilterSelector::Name(name)
    }
}

/// A filter record returned by [`Client::list_filters`].
impl TryFrom<&Record> for FilterSelector {
    type Error = CommandError;

    fn try_from(record: &Record) -> Result<Self> {
        match record.get("sFilter") {
            Some(Value::Str(name)) => Ok(FilterSelector::Name(name.clone())),
            Some(Value::Int(id)) => Ok(FilterSelector::Id(*id)),
            _ => Err(CommandError::invalid("filter record has no sFilter")),
        }
    }
}

/// Command client over a caller-owned transport.
#[derive(Debug)]
pub struct Client<T: Transport> {
    transport: T,
    name_map: NameMap,
}

impl<T: Transport> Client<T> {
    /// Client with an empty name map.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            name_map: NameMap::new(),
        }
    }

    /// Sets the wire name remap applied to case reads and writes.
    pub fn with_name_map(mut self, name_map: NameMap) -> Self {
        self.name_map = name_map;
        self
    }

    /// Remap applied to case reads and writes.
    pub fn name_map(&self) -> &NameMap {
        &self.name_map
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn send(&self, request: Request) -> Result<String> {
        tracing::debug!(
            command = %request.command,
            args = request.args.len(),
            files = request.args.files.len(),
            "sending request"
        );
        self.transport.call(request)
    }

    fn list(
        &self,
        request: Request,
        container: &str,
        schema: &Schema,
        sort_by: SortBy,
    ) -> Result<Vec<Record>> {
        let body = self.send(request)?;
        let doc = parse_response(&body)?;
        let node = element(doc.root_element(), container)?;
        Ok(extract_all(node.children(), schema, &NameMap::new(), sort_by)?)
    }

    fn view(&self, request: Request, tag: &str, schema: &Schema) -> Result<Record> {
        let body = self.send(request)?;
        let doc = parse_response(&body)?;
        let node = element(doc.root_element(), tag)?;
        Ok(extract(&node, schema, &NameMap::new())?)
    }

    fn acknowledge(&self, request: Request) -> Result<()> {
        let body = self.send(request)?;
        parse_response(&body)?;
        Ok(())
    }

    /// Saved filters, in server order unless sorted.
    pub fn list_filters(&self, options: &ListOptions) -> Result<Vec<Record>> {
        self.list(
            Request::new("listFilters"),
            "filters",
            &FB_FILTER,
            sort_or(&options.sort_by, SortBy::none()),
        )
    }

    /// Makes a saved filter current for later searches.
    pub fn set_current_filter(&self, filter: impl Into<FilterSelector>) -> Result<()> {
        let filter = filter.into();
        self.acknowledge(Request::new("setCurrentFilter").arg("sFilter", filter.wire_value()))
    }

    /// Searches cases and extracts them with `schema`.
    ///
    /// Unless `args` already carries `cols`, the column list is derived from
    /// the schema so the response holds every field the schema reads.
    pub fn search(
        &self,
        schema: &Schema,
        q: Option<&str>,
        args: WireArgs,
        sort_by: impl Into<SortBy>,
    ) -> Result<Vec<Record>> {
        let mut request = Request::with_args("search", args).arg_opt("q", q);
        if !request.args.contains("cols") {
            let cols = column_list::<&str>(schema, &self.name_map, None)?;
            request.args.insert("cols", cols);
        }
        let body = self.send(request)?;
        let doc = parse_response(&body)?;
        let cases = element(doc.root_element(), "cases")?;
        Ok(extract_all(
            cases.children(),
            schema,
            &self.name_map,
            sort_by,
        )?)
    }

    /// Opens a new case and returns its number.
    pub fn new_case(&self, case: &Record, schema: &Schema) -> Result<i64> {
        if case.contains("cols") {
            return Err(CommandError::invalid(
                "the 'cols' argument cannot be specified for a new case",
            ));
        }
        let mut args = to_wire_args(case, schema, &self.name_map)?;
        args.insert("cols", "ixBug");

        let body = self.send(Request::with_args("new", args))?;
        let doc = parse_response(&body)?;
        let node = element(doc.root_element(), "case")?;
        let record = extract(&node, &FB_BUG_IXBUG, &NameMap::new())?;
        Ok(record["ixBug"].as_int().unwrap_or_default())
    }

    /// `edit`: updates a case. With a `cols` entry in `case`, returns those
    /// fields of the updated case.
    pub fn edit(&self, case: &Record, schema: &Schema) -> Result<Option<Record>> {
        self.edit_call("edit", case, schema)
    }

    /// Resolves a case; see [`Client::edit`] for `case`.
    pub fn resolve(&self, case: &Record, schema: &Schema) -> Result<Option<Record>> {
        self.edit_call("resolve", case, schema)
    }

    /// Closes a case; see [`Client::edit`] for `case`.
    pub fn close(&self, case: &Record, schema: &Schema) -> Result<Option<Record>> {
        self.edit_call("close", case, schema)
    }

    /// Reopens a closed case; see [`Client::edit`] for `case`.
    pub fn reopen(&self, case: &Record, schema: &Schema) -> Result<Option<Record>> {
        self.edit_call("reopen", case, schema)
    }

    /// Reactivates a resolved case; see [`Client::edit`] for `case`.
    pub fn reactivate(&self, case: &Record, schema: &Schema) -> Result<Option<Record>> {
        self.edit_call("reactivate", case, schema)
    }

    fn edit_call(&self, command: &str, case: &Record, schema: &Schema) -> Result<Option<Record>> {
        let mut case = case.clone();
        let cols = match case.remove("cols") {
            None | Some(Value::Null) => None,
            Some(Value::Str(cols)) => {
                let names = comma_or_space_split(&cols);
                if names.is_empty() {
                    None
                } else {
                    Some(schema.subset(&names)?)
                }
            }
            Some(Value::List(items)) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .ok_or_else(|| CommandError::invalid("'cols' entries must be strings"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Some(schema.subset(&names)?)
            }
            Some(other) => {
                return Err(CommandError::invalid(format!(
                    "'cols' must be a string or list, got {}",
                    other.kind_name()
                )));
            }
        };

        let mut args = to_wire_args(&case, schema, &self.name_map)?;
        if let Some(subset) = &cols {
            args.insert("cols", column_list::<&str>(subset, &self.name_map, None)?);
        }

        let body = self.send(Request::with_args(command, args))?;
        let doc = parse_response(&body)?;
        let Some(subset) = cols else {
            return Ok(None);
        };
        let node = element(doc.root_element(), "case")?;
        Ok(Some(extract(&node, &subset, &self.name_map)?))
    }

    /// Every tag in use.
    pub fn list_tags(&self, options: &ListOptions) -> Result<Vec<Record>> {
        self.list(
            Request::new("listTags"),
            "tags",
            &FB_TAG,
            sort_or(&options.sort_by, SortBy::none()),
        )
    }

    /// One project, by `ixProject` or by `sProject`.
    pub fn view_project(&self, ix_project: Option<i64>, s_project: Option<&str>) -> Result<Record> {
        let request = match (ix_project, s_project) {
            (Some(ix), None) => Request::new("viewProject").arg("ixProject", ix),
            (None, Some(name)) => Request::new("viewProject").arg("sProject", name),
            _ => return Err(CommandError::invalid("Must supply ixProject or sProject")),
        };
        self.view(request, "project", &FB_PROJECT)
    }

    /// Projects, sorted by `ixProject` unless overridden.
    pub fn list_projects(&self, options: &ListProjects) -> Result<Vec<Record>> {
        let request = Request::new("listProjects")
            .arg_opt("ixProject", options.ix_project)
            .flag("fWrite", options.write)
            .flag("fIncludeDeleted", options.include_deleted);
        self.list(
            request,
            "projects",
            &FB_PROJECT,
            sort_or(&options.sort_by, ["ixProject", "ixArea"]),
        )
    }

    /// One area, by `ixArea` or by `ixProject` and `sArea`.
    pub fn view_area(
        &self,
        ix_area: Option<i64>,
        ix_project: Option<i64>,
        s_area: Option<&str>,
    ) -> Result<Record> {
        let request = match (ix_area, ix_project, s_area) {
            (Some(ix), None, None) => Request::new("viewArea").arg("ixArea", ix),
            (None, Some(project), Some(name)) => Request::new("viewArea")
                .arg("ixProject", project)
                .arg("sArea", name),
            _ => return Err(CommandError::invalid("Must supply ixArea or (ixProject and sArea)")),
        };
        self.view(request, "area", &FB_AREA)
    }

    /// Areas, sorted by `(ixProject, ixArea)` unless overridden.
    pub fn list_areas(&self, options: &ListAreas) -> Result<Vec<Record>> {
        let request = Request::new("listAreas")
            .arg_opt("ixProject", options.ix_project)
            .arg_opt("ixArea", options.ix_area)
            .flag("fWrite", options.write);
        self.list(
            request,
            "areas",
            &FB_AREA,
            sort_or(&options.sort_by, ["ixProject", "ixArea"]),
        )
    }

    /// One category.
    pub fn view_category(&self, ix_category: i64) -> Result<Record> {
        self.view(
            Request::new("viewCategory").arg("ixCategory", ix_category),
            "category",
            &FB_CATEGORY,
        )
    }

    /// Categories, sorted by `ixCategory` unless overridden.
    pub fn list_categories(&self, options: &ListOptions) -> Result<Vec<Record>> {
        self.list(
            Request::new("listCategories"),
            "categories",
            &FB_CATEGORY,
            sort_or(&options.sort_by, "ixCategory"),
        )
    }

    /// One priority.
    pub fn view_priority(&self, ix_priority: i64) -> Result<Record> {
        self.view(
            Request::new("viewPriority").arg("ixPriority", ix_priority),
            "priority",
            &FB_PRIORITY,
        )
    }

    /// Priorities, sorted by `ixPriority` unless overridden.
    pub fn list_priorities(&self, options: &ListOptions) -> Result<Vec<Record>> {
        self.list(
            Request::new("listPriorities"),
            "priorities",
            &FB_PRIORITY,
            sort_or(&options.sort_by, "ixPriority"),
        )
    }

    /// One person, by `ixPerson` or by `sEmail`.
    pub fn view_person(&self, ix_person: Option<i64>, s_email: Option<&str>) -> Result<Record> {
        let request = match (ix_person, s_email) {
            (Some(ix), None) => Request::new("viewPerson").arg("ixPerson", ix),
            (None, Some(email)) => Request::new("viewPerson").arg("sEmail", email),
            _ => return Err(CommandError::invalid("Must supply ixPerson or sEmail")),
        };
        self.view(request, "person", &FB_PERSON)
    }

    /// People matching the inclusion flags.
    pub fn list_people(&self, options: &ListPeople) -> Result<Vec<Record>> {
        let request = Request::new("listPeople")
            .arg_opt("fIncludeDeleted", options.include_deleted.map(u8::from))
            .arg_opt("fIncludeVirtual", options.include_virtual.map(u8::from))
            .arg_opt("fIncludeNormal", options.include_normal.map(u8::from))
            .arg_opt("fIncludeActive", options.include_active.map(u8::from))
            .arg_opt("fIncludeCommunity", options.include_community.map(u8::from));
        self.list(
            request,
            "people",
            &FB_PERSON,
            sort_or(&options.sort_by, SortBy::none()),
        )
    }

    /// One status, by `ixStatus` or by `ixCategory` and `sStatus`.
    pub fn view_status(
        &self,
        ix_status: Option<i64>,
        ix_category: Option<i64>,
        s_status: Option<&str>,
    ) -> Result<Record> {
        let request = match (ix_status, ix_category, s_status) {
            (Some(ix), None, None) => Request::new("viewStatus").arg("ixStatus", ix),
            (None, Some(category), Some(name)) => Request::new("viewStatus")
                .arg("ixCategory", category)
                .arg("sStatus", name),
            _ => {
                return Err(CommandError::invalid(
                    "Must supply ixStatus or (ixCategory and sStatus)",
                ));
            }
        };
        self.view(request, "status", &FB_STATUS)
    }

    /// Statuses, sorted by `(ixCategory, iOrder)` unless overridden.
    pub fn list_statuses(&self, options: &ListStatuses) -> Result<Vec<Record>> {
        let request = Request::new("listStatuses")
            .arg_opt("ixCategory", options.ix_category)
            .flag("fResolved", options.resolved);
        self.list(
            request,
            "statuses",
            &FB_STATUS,
            sort_or(&options.sort_by, ["ixCategory", "iOrder"]),
        )
    }

    /// One milestone, by `ixFixFor` or by `ixProject` and `sFixFor`.
    pub fn view_fix_for(
        &self,
        ix_fix_for: Option<i64>,
        ix_project: Option<i64>,
        s_fix_for: Option<&str>,
    ) -> Result<Record> {
        let request = match (ix_fix_for, ix_project, s_fix_for) {
            (Some(ix), None, None) => Request::new("viewFixFor").arg("ixFixFor", ix),
            (None, Some(project), Some(name)) => Request::new("viewFixFor")
                .arg("ixProject", project)
                .arg("sFixFor", name),
            _ => {
                return Err(CommandError::invalid(
                    "Must supply ixFixFor or (ixProject and sFixFor)",
                ));
            }
        };
        self.view(request, "fixfor", &FB_FIX_FOR)
    }

    /// Alias of [`Client::view_fix_for`].
    pub fn view_milestone(
        &self,
        ix_fix_for: Option<i64>,
        ix_project: Option<i64>,
        s_fix_for: Option<&str>,
    ) -> Result<Record> {
        self.view_fix_for(ix_fix_for, ix_project, s_fix_for)
    }

    /// Milestones, sorted by `ixProject` unless overridden.
    pub fn list_fix_fors(&self, options: &ListFixFors) -> Result<Vec<Record>> {
        let request = Request::new("listFixFors")
            .arg_opt("ixProject", options.ix_project)
            .arg_opt("ixFixFor", options.ix_fix_for)
            .flag("fIncludeDeleted", options.include_deleted)
            .flag("fIncludeReallyDeleted", options.include_really_deleted);
        self.list(
            request,
            "fixfors",
            &FB_FIX_FOR,
            sort_or(&options.sort_by, "ixProject"),
        )
    }

    /// Alias of [`Client::list_fix_fors`].
    pub fn list_milestones(&self, options: &ListFixFors) -> Result<Vec<Record>> {
        self.list_fix_fors(options)
    }

    /// Subscribes to a case. Subscribing someone else (`ix_person`) needs an
    /// administrator session.
    pub fn subscribe(&self, ix_bug: i64, ix_person: Option<i64>) -> Result<()> {
        self.acknowledge(
            Request::new("subscribe")
                .arg("ixBug", ix_bug)
                .arg_opt("ixPerson", ix_person),
        )
    }

    /// Drops a case subscription.
    pub fn unsubscribe(&self, ix_bug: i64, ix_person: Option<i64>) -> Result<()> {
        self.acknowledge(
            Request::new("unsubscribe")
                .arg("ixBug", ix_bug)
                .arg_opt("ixPerson", ix_person),
        )
    }

    /// Names of the custom field columns, sampled from the given cases.
    ///
    /// Useful for building a name remap: custom fields come back as
    /// `plugin_customfields_at_...` elements.
    pub fn list_custom_field_names(&self, sample_bugs: &str) -> Result<Vec<String>> {
        let request = Request::new("search")
            .arg("q", sample_bugs)
            .arg("cols", CUSTOM_FIELDS_COLUMN)
            .arg("max", 1);
        let body = self.send(request)?;
        let doc = parse_response(&body)?;
        let names: BTreeSet<String> = doc
            .root_element()
            .descendants()
            .filter(|n| n.is_element())
            .map(|n| n.tag_name().name())
            .filter(|name| name.starts_with(CUSTOM_FIELDS_COLUMN) && *name != CUSTOM_FIELDS_COLUMN)
            .map(str::to_string)
            .collect();
        Ok(names.into_iter().collect())
    }
}

fn sort_or(sort_by: &Option<SortBy>, default: impl Into<SortBy>) -> SortBy {
    sort_by.clone().unwrap_or_else(|| default.into())
}

/// Parses a response body, turning an `<error>` element into
/// [`CommandError::Api`].
fn parse_response(body: &str) -> Result<roxmltree::Document<'_>> {
    let doc = parse_document(body)?;
    let root = doc.root_element();
    let error = if root.has_tag_name("error") {
        Some(root)
    } else {
        root.children().find(|n| n.has_tag_name("error"))
    };
    if let Some(error) = error {
        let record = extract(&error, &FB_ERROR, &NameMap::new())?;
        let code = record["code"].as_int().unwrap_or_default();
        let message = record["sError"].as_str().unwrap_or_default().to_string();
        tracing::warn!(code, %message, "API returned an error");
        return Err(CommandError::Api { code, message });
    }
    Ok(doc)
}

fn element<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    tag: &str,
) -> Result<roxmltree::Node<'a, 'input>> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .ok_or_else(|| CommandError::MissingElement {
            tag: tag.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_error() {
        let body = r#"<response><error code="3"><![CDATA[Not logged on]]></error></response>"#;
        let err = parse_response(body).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Api { code: 3, ref message } if message == "Not logged on"
        ));
    }

    #[test]
    fn test_parse_response_ok() {
        let doc = parse_response("<response><cases count=\"0\"/></response>").unwrap();
        assert!(element(doc.root_element(), "cases").is_ok());
        assert!(matches!(
            element(doc.root_element(), "projects"),
            Err(CommandError::MissingElement { tag }) if tag == "projects"
        ));
    }

    #[test]
    fn test_filter_selector() {
        assert_eq!(FilterSelector::from(7i64).wire_value(), "7");
        assert_eq!(FilterSelector::from("ez").wire_value(), "ez");
        let record = Record::new().with("sFilter", "inbox");
        assert_eq!(
            FilterSelector::try_from(&record).unwrap(),
            FilterSelector::Name("inbox".into())
        );
        assert!(FilterSelector::try_from(&Record::new()).is_err());
    }

    #[test]
    fn test_sort_or() {
        assert_eq!(sort_or(&None, "ixProject"), SortBy::from("ixProject"));
        assert!(sort_or(&Some(SortBy::none()), "ixProject").is_empty());
    }
}
