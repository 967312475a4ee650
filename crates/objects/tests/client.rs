use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use fbmap_objects::schemas::{FB_BUG, FB_BUG_EDIT, FB_BUG_WITH_LATEST_EVENT};
use fbmap_objects::{
    Client, CommandError, FilterSelector, ListAreas, ListFixFors, ListOptions, ListPeople,
    ListProjects, ListStatuses, Request, Transport,
};
use fbmap_typemap::{Attachment, NameMap, Record, SortBy, TypemapError, Value, WireArgs};

#[derive(Debug)]
struct Sent {
    command: String,
    args: BTreeMap<String, String>,
    files: Vec<String>,
}

/// Replays canned responses and records every request.
#[derive(Default)]
struct MockTransport {
    responses: RefCell<VecDeque<String>>,
    sent: RefCell<Vec<Sent>>,
}

impl MockTransport {
    fn replying(responses: &[&str]) -> Self {
        let mock = Self::default();
        mock.responses
            .borrow_mut()
            .extend(responses.iter().map(|r| r.to_string()));
        mock
    }

    fn last(&self) -> Sent {
        self.sent.borrow_mut().pop().expect("a request was sent")
    }
}

impl Transport for MockTransport {
    fn call(&self, request: Request) -> fbmap_objects::Result<String> {
        self.sent.borrow_mut().push(Sent {
            command: request.command,
            args: request.args.fields.clone(),
            files: request.args.files.keys().cloned().collect(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| CommandError::transport("no canned response"))
    }
}

const CASES: &str = r#"<response>
  <cases count="2">
    <case ixBug="20" operations="edit">
      <ixBug>20</ixBug><ixBugParent>0</ixBugParent><ixBugChildren>21,22</ixBugChildren>
      <sTitle>Second</sTitle><ixProject>1</ixProject><sProject>Core</sProject>
      <ixArea>2</ixArea><sArea>UI</sArea><ixCategory>1</ixCategory><sCategory>Bug</sCategory>
      <ixPriority>3</ixPriority><sPriority>Must Fix</sPriority>
      <ixPersonAssignedTo>5</ixPersonAssignedTo><sPersonAssignedTo>Ann</sPersonAssignedTo>
      <plugin_customfields_at_x_customer>ACME</plugin_customfields_at_x_customer>
    </case>
    <case ixBug="10" operations="edit">
      <ixBug>10</ixBug><ixBugParent>0</ixBugParent><ixBugChildren></ixBugChildren>
      <sTitle>First</sTitle><ixProject>1</ixProject><sProject>Core</sProject>
      <ixArea>2</ixArea><sArea>UI</sArea><ixCategory>1</ixCategory><sCategory>Bug</sCategory>
      <ixPriority>3</ixPriority><sPriority>Must Fix</sPriority>
      <ixPersonAssignedTo>5</ixPersonAssignedTo><sPersonAssignedTo>Ann</sPersonAssignedTo>
      <plugin_customfields_at_x_customer></plugin_customfields_at_x_customer>
    </case>
  </cases>
</response>"#;

#[test]
fn test_search_builds_cols_and_sorts() {
    let mock = MockTransport::replying(&[CASES]);
    let client = Client::new(&mock);

    let cases = client
        .search(&FB_BUG, Some("project:Core"), WireArgs::new(), "ixBug")
        .unwrap();

    let sent = mock.last();
    assert_eq!(sent.command, "search");
    assert_eq!(sent.args["q"], "project:Core");
    let cols: Vec<_> = sent.args["cols"].split(',').collect();
    assert!(cols.contains(&"ixBugChildren"));
    assert_eq!(cols.len(), FB_BUG.len());

    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0]["ixBug"], Value::Int(10));
    assert_eq!(cases[0]["ixBugChildren"], Value::List(vec![]));
    assert_eq!(cases[1]["ixBugChildren"], Value::from(vec![21i64, 22]));
}

#[test]
fn test_search_with_name_map() {
    let schema = fbmap_typemap::Schema::builder()
        .include(&FB_BUG)
        .field("sCustomer", fbmap_typemap::Field::string())
        .build()
        .unwrap();
    let mut names = NameMap::new();
    names.insert("sCustomer".into(), "plugin_customfields_at_x_customer".into());

    let mock = MockTransport::replying(&[CASES]);
    let client = Client::new(&mock).with_name_map(names);
    let cases = client.search(&schema, None, WireArgs::new(), SortBy::none()).unwrap();

    let sent = mock.last();
    assert!(!sent.args.contains_key("q"));
    assert!(sent.args["cols"].contains("plugin_customfields_at_x_customer"));
    assert_eq!(cases[0]["sCustomer"], Value::from("ACME"));
    assert_eq!(cases[1]["sCustomer"], Value::from(""));
}

#[test]
fn test_search_keeps_caller_cols() {
    let body = r#"<response><cases count="1"><case ixBug="4"><sTitle>t</sTitle></case></cases></response>"#;
    let mock = MockTransport::replying(&[body]);
    let client = Client::new(&mock);
    let schema = FB_BUG.subset(&["sTitle"]).unwrap();
    let cases = client
        .search(&schema, Some("4"), WireArgs::new().with("cols", "sTitle").with("max", "1"), SortBy::none())
        .unwrap();
    assert_eq!(cases[0]["sTitle"], Value::from("t"));
    assert_eq!(mock.last().args["max"], "1");
}

#[test]
fn test_api_error_is_reported() {
    let mock = MockTransport::replying(&[r#"<response><error code="3">Not logged on</error></response>"#]);
    let client = Client::new(&mock);
    let err = client.list_tags(&ListOptions::default()).unwrap_err();
    assert!(matches!(err, CommandError::Api { code: 3, message } if message == "Not logged on"));
}

#[test]
fn test_new_case() {
    let body = r#"<response><case ixBug="31" operations="edit,assign"><ixBug>31</ixBug></case></response>"#;
    let mock = MockTransport::replying(&[body]);
    let client = Client::new(&mock);

    let case = Record::new().with("sTitle", "Crash").with("ixProject", 1);
    let ix_bug = client.new_case(&case, &FB_BUG_EDIT).unwrap();
    assert_eq!(ix_bug, 31);

    let sent = mock.last();
    assert_eq!(sent.command, "new");
    assert_eq!(sent.args["cols"], "ixBug");
    assert_eq!(sent.args["sTitle"], "Crash");
    assert_eq!(sent.args["ixProject"], "1");
}

#[test]
fn test_new_case_rejects_cols() {
    let mock = MockTransport::default();
    let client = Client::new(&mock);
    let case = Record::new().with("sTitle", "x").with("cols", "ixBug");
    assert!(matches!(
        client.new_case(&case, &FB_BUG_EDIT),
        Err(CommandError::InvalidArguments { .. })
    ));
    assert!(mock.sent.borrow().is_empty());
}

#[test]
fn test_edit_with_cols_subset() {
    let body = r#"<response><case ixBug="7"><sTitle>Renamed</sTitle><ixPriority>2</ixPriority></case></response>"#;
    let mock = MockTransport::replying(&[body]);
    let client = Client::new(&mock);

    let case = Record::new()
        .with("ixBug", 7)
        .with("sTitle", "Renamed")
        .with("cols", "sTitle, ixPriority");
    let updated = client.edit(&case, &FB_BUG_EDIT).unwrap().unwrap();
    assert_eq!(updated.len(), 2);
    assert_eq!(updated["ixPriority"], Value::Int(2));

    let sent = mock.last();
    assert_eq!(sent.command, "edit");
    assert_eq!(sent.args["cols"], "ixPriority,sTitle");
    assert_eq!(sent.args["ixBug"], "7");
}

#[test]
fn test_edit_unknown_col() {
    let mock = MockTransport::default();
    let client = Client::new(&mock);
    let case = Record::new().with("ixBug", 7).with("cols", "sNope");
    let err = client.resolve(&case, &FB_BUG_EDIT).unwrap_err();
    assert!(matches!(
        err,
        CommandError::Typemap(TypemapError::UnknownColumn { column }) if column == "sNope"
    ));
}

#[test]
fn test_close_without_cols_returns_none() {
    let mock = MockTransport::replying(&["<response><case ixBug=\"7\"/></response>"]);
    let client = Client::new(&mock);
    let result = client.close(&Record::new().with("ixBug", 7), &FB_BUG_EDIT).unwrap();
    assert!(result.is_none());
    assert!(!mock.last().args.contains_key("cols"));
}

#[test]
fn test_edit_sends_attachments() {
    let mock = MockTransport::replying(&["<response><case ixBug=\"7\"/></response>"]);
    let client = Client::new(&mock);

    let mut files = BTreeMap::new();
    files.insert(
        "File1".to_string(),
        Attachment::from_reader(std::io::Cursor::new(b"trace".to_vec())),
    );
    let case = Record::new()
        .with("ixBug", 7)
        .with("Files", Value::Attachments(files));
    client.reopen(&case, &FB_BUG_EDIT).unwrap();

    let sent = mock.last();
    assert_eq!(sent.command, "reopen");
    assert_eq!(sent.files, vec!["File1".to_string()]);
    assert!(!sent.args.contains_key("Files"));
}

#[test]
fn test_read_only_event_fields_cannot_be_written() {
    let mock = MockTransport::default();
    let client = Client::new(&mock);
    let case = Record::new()
        .with("ixBug", 7)
        .with("latestEvent", Record::new());
    assert!(matches!(
        client.reactivate(&case, &FB_BUG_WITH_LATEST_EVENT),
        Err(CommandError::Typemap(TypemapError::WriteOnUnwritableField { .. }))
    ));
}

#[test]
fn test_list_filters_and_set_current() {
    let body = r#"<response><filters>
        <filter type="builtin" sFilter="ez">My Cases</filter>
        <filter type="shared" sFilter="7" status="current"><![CDATA[Active Bugs]]></filter>
    </filters></response>"#;
    let mock = MockTransport::replying(&[body, "<response/>"]);
    let client = Client::new(&mock);

    let filters = client.list_filters(&ListOptions::default()).unwrap();
    assert_eq!(filters.len(), 2);
    assert_eq!(filters[1]["sFilterName"], Value::from("Active Bugs"));
    assert_eq!(filters[1]["status"], Value::from("current"));
    assert_eq!(filters[0]["status"], Value::Null);

    let selector = FilterSelector::try_from(&filters[1]).unwrap();
    client.set_current_filter(selector).unwrap();
    let sent = mock.last();
    assert_eq!(sent.command, "setCurrentFilter");
    assert_eq!(sent.args["sFilter"], "7");
}

#[test]
fn test_list_projects_default_sort_and_flags() {
    let body = r#"<response><projects>
        <project><ixProject>3</ixProject><sProject>C</sProject><ixPersonOwner>1</ixPersonOwner>
          <sPersonOwner>A</sPersonOwner><sEmail/><sPhone/><fInbox>false</fInbox>
          <ixWorkflow>1</ixWorkflow><fDeleted>false</fDeleted></project>
        <project><ixProject>1</ixProject><sProject>A</sProject><ixPersonOwner>1</ixPersonOwner>
          <sPersonOwner>A</sPersonOwner><sEmail/><sPhone/><fInbox>true</fInbox>
          <ixWorkflow>1</ixWorkflow><fDeleted>false</fDeleted></project>
    </projects></response>"#;
    let mock = MockTransport::replying(&[body]);
    let client = Client::new(&mock);

    let projects = client
        .list_projects(&ListProjects {
            write: true,
            ..Default::default()
        })
        .unwrap();
    let ids: Vec<_> = projects.iter().filter_map(|p| p["ixProject"].as_int()).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(projects[0]["fInbox"], Value::Bool(true));

    let sent = mock.last();
    assert_eq!(sent.command, "listProjects");
    assert_eq!(sent.args.get("fWrite").map(String::as_str), Some("1"));
    assert!(!sent.args.contains_key("fIncludeDeleted"));
}

#[test]
fn test_list_areas_missing_container() {
    let mock = MockTransport::replying(&["<response><projects/></response>"]);
    let client = Client::new(&mock);
    assert!(matches!(
        client.list_areas(&ListAreas::default()),
        Err(CommandError::MissingElement { tag }) if tag == "areas"
    ));
}

#[test]
fn test_list_people_sends_explicit_flags_only() {
    let mock = MockTransport::replying(&["<response><people/></response>"]);
    let client = Client::new(&mock);
    let people = client
        .list_people(&ListPeople {
            include_virtual: Some(false),
            include_deleted: Some(true),
            ..Default::default()
        })
        .unwrap();
    assert!(people.is_empty());

    let sent = mock.last();
    assert_eq!(sent.args["fIncludeVirtual"], "0");
    assert_eq!(sent.args["fIncludeDeleted"], "1");
    assert!(!sent.args.contains_key("fIncludeNormal"));
}

#[test]
fn test_view_argument_validation() {
    let mock = MockTransport::default();
    let client = Client::new(&mock);
    assert!(matches!(
        client.view_project(None, None),
        Err(CommandError::InvalidArguments { .. })
    ));
    assert!(client.view_project(Some(1), Some("Core")).is_err());
    assert!(client.view_area(Some(1), Some(2), None).is_err());
    assert!(client.view_area(None, Some(2), None).is_err());
    assert!(client.view_person(None, None).is_err());
    assert!(client.view_status(None, Some(1), None).is_err());
    assert!(client.view_fix_for(Some(1), None, Some("1.0")).is_err());
    assert!(mock.sent.borrow().is_empty());
}

#[test]
fn test_view_milestone() {
    let body = r#"<response><fixfor>
        <ixFixFor>4</ixFixFor><sFixFor>1.0</sFixFor><ixProject>1</ixProject><sProject>Core</sProject>
        <fDeleted>false</fDeleted><fReallyDeleted>false</fReallyDeleted>
        <dt>2012-05-06T07:08:09Z</dt><dtStart></dtStart><sStartNote/>
        <setixFixForDependency><ixFixFor>2</ixFixFor><ixFixFor>3</ixFixFor></setixFixForDependency>
    </fixfor></response>"#;
    let mock = MockTransport::replying(&[body]);
    let client = Client::new(&mock);

    let milestone = client.view_milestone(None, Some(1), Some("1.0")).unwrap();
    assert_eq!(milestone["dtStart"], Value::DateTime(None));
    assert_eq!(milestone["setixFixForDependency"], Value::from(vec![2i64, 3]));

    let sent = mock.last();
    assert_eq!(sent.command, "viewFixFor");
    assert_eq!(sent.args["ixProject"], "1");
    assert_eq!(sent.args["sFixFor"], "1.0");
}

fn status(ix: i64, category: i64, order: i64) -> String {
    format!(
        "<status><ixStatus>{ix}</ixStatus><sStatus>S{ix}</sStatus><ixCategory>{category}</ixCategory>\
         <fWorkDone>false</fWorkDone><fResolved>true</fResolved><fDuplicate>false</fDuplicate>\
         <fDeleted>false</fDeleted><iOrder>{order}</iOrder></status>"
    )
}

#[test]
fn test_list_statuses_sorted_by_category_then_order() {
    let body = format!(
        "<response><statuses>{}{}{}</statuses></response>",
        status(7, 2, 0),
        status(5, 1, 3),
        status(6, 1, 1),
    );
    let mock = MockTransport::replying(&[body.as_str()]);
    let client = Client::new(&mock);

    let statuses = client
        .list_statuses(&ListStatuses {
            ix_category: Some(1),
            resolved: true,
            ..Default::default()
        })
        .unwrap();
    let ids: Vec<_> = statuses.iter().filter_map(|s| s["ixStatus"].as_int()).collect();
    assert_eq!(ids, vec![6, 5, 7]);

    let sent = mock.last();
    assert_eq!(sent.command, "listStatuses");
    assert_eq!(sent.args["ixCategory"], "1");
    assert_eq!(sent.args["fResolved"], "1");
}

#[test]
fn test_priorities_and_categories() {
    let priorities = r#"<response><priorities>
        <priority><ixPriority>2</ixPriority><fDefault>false</fDefault><sPriority>Must Fix</sPriority></priority>
        <priority><ixPriority>1</ixPriority><fDefault>true</fDefault><sPriority>Blocker</sPriority></priority>
    </priorities></response>"#;
    let priority = r#"<response><priority>
        <ixPriority>3</ixPriority><fDefault>false</fDefault><sPriority>Fix If Time</sPriority>
    </priority></response>"#;
    let category = r#"<response><category>
        <ixCategory>1</ixCategory><sCategory>Bug</sCategory><sPlural>Bugs</sPlural>
        <ixStatusDefault>2</ixStatusDefault><fIsScheduleItem>false</fIsScheduleItem>
        <fDeleted>false</fDeleted><iOrder>1</iOrder><nIconType>1</nIconType>
        <ixAttachmentIcon>0</ixAttachmentIcon><ixStatusDefaultActive>1</ixStatusDefaultActive>
    </category></response>"#;
    let mock = MockTransport::replying(&[priorities, priority, category, "<response/>"]);
    let client = Client::new(&mock);

    let listed = client.list_priorities(&ListOptions::default()).unwrap();
    assert_eq!(listed[0]["sPriority"], Value::from("Blocker"));
    assert_eq!(listed[0]["fDefault"], Value::Bool(true));

    let viewed = client.view_priority(3).unwrap();
    assert_eq!(viewed["ixPriority"], Value::Int(3));
    assert_eq!(mock.last().args["ixPriority"], "3");

    let bug = client.view_category(1).unwrap();
    assert_eq!(bug["sPlural"], Value::from("Bugs"));
    assert_eq!(mock.last().command, "viewCategory");

    assert!(matches!(
        client.list_categories(&ListOptions::sorted("sCategory")),
        Err(CommandError::MissingElement { tag }) if tag == "categories"
    ));
}

#[test]
fn test_list_milestones_sends_fix_for_filters() {
    let mock = MockTransport::replying(&["<response><fixfors/></response>"]);
    let client = Client::new(&mock);

    let milestones = client
        .list_milestones(&ListFixFors {
            ix_project: Some(4),
            include_deleted: true,
            ..Default::default()
        })
        .unwrap();
    assert!(milestones.is_empty());

    let sent = mock.last();
    assert_eq!(sent.command, "listFixFors");
    assert_eq!(sent.args["ixProject"], "4");
    assert_eq!(sent.args["fIncludeDeleted"], "1");
    assert!(!sent.args.contains_key("fIncludeReallyDeleted"));
}

#[test]
fn test_subscribe() {
    let mock = MockTransport::replying(&["<response/>", "<response/>"]);
    let client = Client::new(&mock);
    client.subscribe(12, None).unwrap();
    assert!(!mock.last().args.contains_key("ixPerson"));
    client.unsubscribe(12, Some(4)).unwrap();
    let sent = mock.last();
    assert_eq!(sent.command, "unsubscribe");
    assert_eq!(sent.args["ixPerson"], "4");
}

#[test]
fn test_list_custom_field_names() {
    let body = r#"<response><cases><case ixBug="1"><plugin_customfields>
        <plugin_customfields_at_x_customer/>
        <plugin_customfields_at_x_cost/>
    </plugin_customfields></case></cases></response>"#;
    let mock = MockTransport::replying(&[body]);
    let client = Client::new(&mock);
    let names = client.list_custom_field_names("1,2,3").unwrap();
    assert_eq!(
        names,
        vec![
            "plugin_customfields_at_x_cost".to_string(),
            "plugin_customfields_at_x_customer".to_string()
        ]
    );
    assert_eq!(mock.last().args["cols"], "plugin_customfields");
}

#[test]
fn test_transport_failure_propagates() {
    let mock = MockTransport::default();
    let client = Client::new(&mock);
    assert!(matches!(
        client.list_tags(&ListOptions::sorted("ixTag")),
        Err(CommandError::Transport { .. })
    ));
}
