//! Built-in schemas for the FogBugz XML API objects.
//!
//! Every schema is built on first use and shared afterwards. [`registry`]
//! indexes them by their catalogue name (`fbBug`, `fbFixFor`, ...).

use std::sync::Arc;

use fbmap_typemap::{Converter, Field, Schema, SchemaBuilder, SchemaRef, SchemaRegistry};
use once_cell::sync::Lazy;

fn freeze(builder: SchemaBuilder) -> SchemaRef {
    Arc::new(builder.build().expect("built-in schema is valid"))
}

/// Fields carried by an event only when it records an email.
const EMAIL_FIELDS: [&str; 8] = [
    "sFrom", "sTo", "sBCC", "sReplyTo", "sSubject", "sDate", "sBody", "sBodyHTML",
];

/// `<error code="3">Not logged on</error>`
pub static FB_ERROR: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("sError", Field::self_text())
            .field("code", Field::attr(Converter::Int)),
    )
});

/// Saved and built-in filters. The data lives in attributes of the
/// `<filter>` element; `sFilter` is the value `setCurrentFilter` expects.
pub static FB_FILTER: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("sFilterName", Field::self_text())
            .field("type", Field::attr(Converter::Str))
            .field("sFilter", Field::attr(Converter::Str))
            .field("status", Field::attr(Converter::Str)),
    )
});

pub static FB_TAG: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixTag", Field::int())
            .field("sTag", Field::string())
            .field("cTagUses", Field::int()),
    )
});

pub static FB_PERSON: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixPerson", Field::int())
            .field("sFullName", Field::string())
            .field("sEmail", Field::string())
            .field("sPhone", Field::string())
            .field("fAdministrator", Field::bool())
            .field("fCommunity", Field::bool())
            .field("fVirtual", Field::bool())
            .field("fDeleted", Field::bool())
            .field("fNotify", Field::bool())
            .field("sHomepage", Field::string())
            .field("sLocale", Field::string())
            .field("sLanguage", Field::string())
            .field("sTimeZoneKey", Field::string())
            .field("sLDAPUid", Field::string())
            .field("dtLastActivity", Field::datetime())
            .field("fRecurseBugChildren", Field::bool())
            .field("fPaletteExpanded", Field::bool())
            .field("ixBugWorkingOn", Field::int())
            .field("sFrom", Field::string()),
    )
});

pub static FB_PROJECT: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixProject", Field::int())
            .field("sProject", Field::string())
            .field("ixPersonOwner", Field::int())
            .field("sPersonOwner", Field::string())
            .field("sEmail", Field::string())
            .field("sPhone", Field::string())
            .field("fInbox", Field::bool())
            .field("ixWorkflow", Field::int())
            .field("fDeleted", Field::bool()),
    )
});

pub static FB_CATEGORY: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixCategory", Field::int())
            .field("sCategory", Field::string())
            .field("sPlural", Field::string())
            .field("ixStatusDefault", Field::int())
            .field("fIsScheduleItem", Field::bool())
            .field("fDeleted", Field::bool())
            .field("iOrder", Field::int())
            .field("nIconType", Field::int())
            .field("ixAttachmentIcon", Field::int())
            .field("ixStatusDefaultActive", Field::int()),
    )
});

pub static FB_PRIORITY: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixPriority", Field::int())
            .field("fDefault", Field::bool())
            .field("sPriority", Field::string()),
    )
});

pub static FB_STATUS: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixStatus", Field::int())
            .field("sStatus", Field::string())
            .field("ixCategory", Field::int())
            .field("fWorkDone", Field::bool())
            .field("fResolved", Field::bool())
            .field("fDuplicate", Field::bool())
            .field("fDeleted", Field::bool())
            .field("iOrder", Field::int()),
    )
});

pub static FB_AREA: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixArea", Field::int())
            .field("sArea", Field::string())
            .field("ixProject", Field::int())
            .field("sProject", Field::string())
            .field("ixPersonOwner", Field::int())
            .field("sPersonOwner", Field::string())
            .field("nType", Field::int())
            .field("cDoc", Field::int()),
    )
});

pub static FB_ATTACHMENT: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("sFilename", Field::string())
            .field("sURL", Field::string()),
    )
});

pub static FB_BUG_MINI_EVENT: Lazy<SchemaRef> = Lazy::new(|| {
    let mut builder = Schema::builder()
        .field("ixBugEvent", Field::int())
        .field("ixBug", Field::attr(Converter::Int))
        .field("evt", Field::int())
        .field("sVerb", Field::string())
        .field("ixPerson", Field::int())
        .field("sPerson", Field::string())
        .field("ixPersonAssignedTo", Field::int())
        .field("dt", Field::datetime())
        .field("fHTML", Field::bool())
        .field("sFormat", Field::string())
        .field("sChanges", Field::string())
        .field("evtDescription", Field::string())
        .field("rgAttachments", Field::list_of_schema(FB_ATTACHMENT.clone()))
        .field("fEmail", Field::bool())
        .field("fExternal", Field::bool());
    for name in EMAIL_FIELDS {
        builder = builder.field(name, Field::conditional_on_flag(Converter::Str, "fEmail"));
    }
    freeze(builder)
});

pub static FB_BUG_EVENT: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("s", Field::string())
            .field("sHTML", Field::string())
            .include(&FB_BUG_MINI_EVENT),
    )
});

/// Just the case number, as returned by `new`.
pub static FB_BUG_IXBUG: Lazy<SchemaRef> =
    Lazy::new(|| freeze(Schema::builder().field("ixBug", Field::int())));

pub static FB_BUG: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixBug", Field::int())
            .field("ixBugParent", Field::int())
            .field("ixBugChildren", Field::comma_list_of(Converter::Int))
            .field("sTitle", Field::string())
            .field("ixProject", Field::int())
            .field("sProject", Field::string())
            .field("ixArea", Field::int())
            .field("sArea", Field::string())
            .field("ixCategory", Field::int())
            .field("sCategory", Field::string())
            .field("ixPriority", Field::int())
            .field("sPriority", Field::string())
            .field("ixPersonAssignedTo", Field::int())
            .field("sPersonAssignedTo", Field::string()),
    )
});

pub static FB_BUG_WITH_LATEST_EVENT: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("latestEvent", Field::latest_event(FB_BUG_EVENT.clone()))
            .include(&FB_BUG),
    )
});

pub static FB_BUG_WITH_EVENTS: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("events", Field::events(FB_BUG_EVENT.clone()))
            .include(&FB_BUG),
    )
});

pub static FB_BUG_WITH_MINI_EVENTS: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("minievents", Field::mini_events(FB_BUG_MINI_EVENT.clone()))
            .include(&FB_BUG),
    )
});

/// The case schema plus the write-only `Files` attachment field used by
/// `new` and the edit family.
pub static FB_BUG_EDIT: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .include(&FB_BUG)
            .field("Files", Field::attachments()),
    )
});

pub static FB_FIX_FOR: Lazy<SchemaRef> = Lazy::new(|| {
    freeze(
        Schema::builder()
            .field("ixFixFor", Field::int())
            .field("sFixFor", Field::string())
            .field("ixProject", Field::int())
            .field("sProject", Field::string())
            .field("fDeleted", Field::col(Converter::Bool).set_name("fAssignable"))
            .field("fReallyDeleted", Field::bool())
            .field("dt", Field::col(Converter::DateTime).set_name("dtRelease"))
            .field("dtStart", Field::datetime())
            .field("sStartNote", Field::string())
            .field(
                "setixFixForDependency",
                Field::col(Converter::list_of(Converter::Int)).read_only(),
            ),
    )
});

static REGISTRY: Lazy<SchemaRegistry> = Lazy::new(|| {
    let catalogue: [(&str, &Lazy<SchemaRef>); 18] = [
        ("fbError", &FB_ERROR),
        ("fbFilter", &FB_FILTER),
        ("fbTag", &FB_TAG),
        ("fbPerson", &FB_PERSON),
        ("fbProject", &FB_PROJECT),
        ("fbCategory", &FB_CATEGORY),
        ("fbPriority", &FB_PRIORITY),
        ("fbStatus", &FB_STATUS),
        ("fbArea", &FB_AREA),
        ("fbAttachment", &FB_ATTACHMENT),
        ("fbBugMiniEvent", &FB_BUG_MINI_EVENT),
        ("fbBugEvent", &FB_BUG_EVENT),
        ("fbBug_ixBug", &FB_BUG_IXBUG),
        ("fbBug", &FB_BUG),
        ("fbBug_withLatestEvent", &FB_BUG_WITH_LATEST_EVENT),
        ("fbBug_withEvents", &FB_BUG_WITH_EVENTS),
        ("fbBug_withMiniEvents", &FB_BUG_WITH_MINI_EVENTS),
        ("fbBug_edit", &FB_BUG_EDIT),
    ];

    let mut registry = SchemaRegistry::new();
    for (name, schema) in catalogue {
        registry
            .register(name, SchemaRef::clone(schema))
            .expect("catalogue names are unique");
    }
    registry
        .register("fbFixFor", FB_FIX_FOR.clone())
        .expect("catalogue names are unique");
    registry
        .alias("fbMilestone", "fbFixFor")
        .expect("fbFixFor is registered");
    tracing::debug!(schemas = registry.len(), "schema catalogue ready");
    registry
});

/// The process-wide catalogue.
pub fn registry() -> &'static SchemaRegistry {
    &REGISTRY
}

/// Looks a catalogue schema up by name.
pub fn schema(name: &str) -> Option<SchemaRef> {
    registry().get(name).cloned()
}
