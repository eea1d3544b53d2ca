use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::WorkflowError;

const RESOLVABLE_AGENT_PREFIXES: [&str; 3] = ["user:", "org:", "team:"];
const LOCAL_FILE_SCHEME: &str = "file:";

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ActionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for ActionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Potential,
    Active,
    Staged,
    Completed,
    Canceled,
    Failed,
    Waiting,
    Endorsed,
}

impl ActionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Potential => "potential",
            Self::Active => "active",
            Self::Staged => "staged",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
            Self::Failed => "failed",
            Self::Waiting => "waiting",
            Self::Endorsed => "endorsed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "potential" => Some(Self::Potential),
            "active" => Some(Self::Active),
            "staged" => Some(Self::Staged),
            "completed" => Some(Self::Completed),
            "canceled" => Some(Self::Canceled),
            "failed" => Some(Self::Failed),
            "waiting" => Some(Self::Waiting),
            "endorsed" => Some(Self::Endorsed),
            _ => None,
        }
    }

    /// Completed, canceled and failed actions never change again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Failed)
    }

    /// Statuses under which an action's output may feed a downstream hop.
    #[must_use]
    pub fn is_live_output(self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Editor,
    Author,
    Reviewer,
    Producer,
    User,
}

impl RoleName {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Editor => "editor",
            Self::Author => "author",
            Self::Reviewer => "reviewer",
            Self::Producer => "producer",
            Self::User => "user",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "editor" => Some(Self::Editor),
            "author" => Some(Self::Author),
            "reviewer" => Some(Self::Reviewer),
            "producer" => Some(Self::Producer),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Role {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role_name: RoleName,
    /// Sub-role, e.g. `"academic editor"` under [`RoleName::Editor`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl Role {
    #[must_use]
    pub fn agent_id(&self) -> Option<&str> {
        self.agent
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn has_resolvable_identity(&self) -> bool {
        self.agent_id().is_some_and(|agent| {
            RESOLVABLE_AGENT_PREFIXES
                .iter()
                .any(|prefix| agent.starts_with(prefix))
        })
    }

    /// Whether `other` can fill this role: same role name and, when this role
    /// names a sub-role, the same sub-role.
    #[must_use]
    pub fn accepts(&self, other: &Role) -> bool {
        if self.role_name != other.role_name {
            return false;
        }
        match self.name.as_deref() {
            Some(name) => other.name.as_deref() == Some(name),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueBox {
    #[serde(rename = "@value")]
    pub value: Value,
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
}

/// A scalar as delivered by the workflow engine: bare, or wrapped in a
/// `{"@value": ...}` box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Literal {
    Boxed(ValueBox),
    Number(f64),
    Text(String),
}

impl Literal {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Present and non-blank, after unwrapping a value box.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Text(value) => !value.trim().is_empty(),
            Self::Number(value) => value.is_finite(),
            Self::Boxed(boxed) => value_is_present(&boxed.value),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Boxed(ValueBox {
                value: Value::String(value),
                ..
            }) => Some(value),
            Self::Boxed(_) | Self::Number(_) => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Boxed(ValueBox {
                value: Value::Number(value),
                ..
            }) => value.as_f64(),
            Self::Boxed(_) | Self::Text(_) => None,
        }
    }
}

/// Shorthand for optional fields: absent counts as blank.
#[must_use]
pub fn is_present(literal: Option<&Literal>) -> bool {
    literal.is_some_and(Literal::is_present)
}

/// Present only when the literal unwraps to a non-blank string.
#[must_use]
pub fn has_text(literal: Option<&Literal>) -> bool {
    literal
        .and_then(Literal::as_text)
        .is_some_and(|value| !value.trim().is_empty())
}

fn value_is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(text) => !text.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => match map.get("@value") {
            Some(inner) => value_is_present(inner),
            None => !map.is_empty(),
        },
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum CommentType {
    #[default]
    Comment,
    RevisionRequestComment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub comment_type: CommentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Literal>,
    /// Checksum of the content version this comment was written against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_match: Option<String>,
}

impl Comment {
    /// A revision request stays open while it targets the current content.
    #[must_use]
    pub fn is_open_revision_request(&self, current_checksum: Option<&str>) -> bool {
        self.comment_type == CommentType::RevisionRequestComment
            && current_checksum.is_some()
            && self.if_match.as_deref() == current_checksum
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Encoding {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_checksum: Option<String>,
}

impl Encoding {
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.file_format
            .as_deref()
            .is_some_and(|format| format.trim_start().starts_with("text/html"))
    }

    #[must_use]
    pub fn references_local_file(&self) -> bool {
        self.content_url
            .as_deref()
            .is_some_and(|url| url.starts_with(LOCAL_FILE_SCHEME))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub struct Resource {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encoding: Vec<Encoding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub has_part: Vec<Resource>,
}

impl Resource {
    #[must_use]
    pub fn has_html_encoding(&self) -> bool {
        self.encoding.iter().any(Encoding::is_html)
    }

    /// True if this resource or any nested part still points at a local file.
    #[must_use]
    pub fn references_local_file(&self) -> bool {
        self.encoding.iter().any(Encoding::references_local_file)
            || self.has_part.iter().any(Resource::references_local_file)
    }
}

/// One graph node of document content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

pub type OverrideMap = BTreeMap<String, Node>;

/// The release graph a workflow operates on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Scope {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_entity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<Role>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub participants: Vec<Role>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseRequirement {
    #[default]
    Submission,
    Production,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StageBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Member snapshots, possibly stale and possibly blinded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result: Vec<Action>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReleaseResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<Literal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateReleaseBody {
    #[serde(default)]
    pub release_requirement: ReleaseRequirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ReleaseResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypesettingBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Encoding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssessBody {
    /// Identifier of the chosen decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Literal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The question this answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Literal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_value: Option<Literal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_body: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_rating: Option<Rating>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ReviewResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub answer: Vec<Answer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeclareBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub question: Vec<Question>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub result: Vec<Answer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublishResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<Literal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PublishBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PublishResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PriceSpecification {
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_currency: Option<String>,
    #[serde(default)]
    pub waived: bool,
}

impl PriceSpecification {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.waived || self.price <= 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PaymentBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_specification: Option<PriceSpecification>,
}

impl PaymentBody {
    /// No price attached counts as free.
    #[must_use]
    pub fn is_free(&self) -> bool {
        match &self.price_specification {
            Some(specification) => specification.is_free(),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub is_based_on: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<UploadResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversionBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// The update action carrying the converted content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ActionId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateBody {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndorseBody {
    pub object: ActionId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InviteBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<Role>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmailMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Literal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InformBody {
    /// Identifier of the decision this notification announces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_match: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<EmailMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuthorizeBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ActionId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentBody {
    pub object: ActionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Literal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ActionKind {
    #[serde(rename = "StartWorkflowStageAction")]
    StartWorkflowStage(StageBody),
    #[serde(rename = "CreateReleaseAction")]
    CreateRelease(CreateReleaseBody),
    #[serde(rename = "TypesettingAction")]
    Typesetting(TypesettingBody),
    #[serde(rename = "AssessAction")]
    Assess(AssessBody),
    #[serde(rename = "ReviewAction")]
    Review(ReviewBody),
    #[serde(rename = "DeclareAction")]
    Declare(DeclareBody),
    #[serde(rename = "PublishAction")]
    Publish(PublishBody),
    #[serde(rename = "BuyAction")]
    Buy(PaymentBody),
    #[serde(rename = "PayAction")]
    Pay(PaymentBody),
    #[serde(rename = "UploadAction")]
    Upload(UploadBody),
    #[serde(rename = "ConversionAction")]
    Conversion(ConversionBody),
    #[serde(rename = "UpdateAction")]
    Update(UpdateBody),
    #[serde(rename = "EndorseAction")]
    Endorse(EndorseBody),
    #[serde(rename = "InviteAction")]
    Invite(InviteBody),
    #[serde(rename = "CheckAction")]
    Check,
    #[serde(rename = "InformAction")]
    Inform(InformBody),
    #[serde(rename = "AuthorizeAction")]
    Authorize(AuthorizeBody),
    #[serde(rename = "CommentAction")]
    Comment(CommentBody),
}

impl ActionKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartWorkflowStage(_) => "StartWorkflowStageAction",
            Self::CreateRelease(_) => "CreateReleaseAction",
            Self::Typesetting(_) => "TypesettingAction",
            Self::Assess(_) => "AssessAction",
            Self::Review(_) => "ReviewAction",
            Self::Declare(_) => "DeclareAction",
            Self::Publish(_) => "PublishAction",
            Self::Buy(_) => "BuyAction",
            Self::Pay(_) => "PayAction",
            Self::Upload(_) => "UploadAction",
            Self::Conversion(_) => "ConversionAction",
            Self::Update(_) => "UpdateAction",
            Self::Endorse(_) => "EndorseAction",
            Self::Invite(_) => "InviteAction",
            Self::Check => "CheckAction",
            Self::Inform(_) => "InformAction",
            Self::Authorize(_) => "AuthorizeAction",
            Self::Comment(_) => "CommentAction",
        }
    }

    /// Kinds performed by a person filling an agent role. Stage markers,
    /// machine conversions, content updates, notifications and comments are not.
    #[must_use]
    pub fn is_role_bearing(&self) -> bool {
        match self {
            Self::CreateRelease(_)
            | Self::Typesetting(_)
            | Self::Assess(_)
            | Self::Review(_)
            | Self::Declare(_)
            | Self::Publish(_)
            | Self::Buy(_)
            | Self::Pay(_)
            | Self::Upload(_)
            | Self::Endorse(_)
            | Self::Invite(_)
            | Self::Check
            | Self::Authorize(_) => true,
            Self::StartWorkflowStage(_)
            | Self::Conversion(_)
            | Self::Update(_)
            | Self::Inform(_)
            | Self::Comment(_) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub id: ActionId,
    #[serde(default)]
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<Role>,
    /// The action this one serves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_of: Option<ActionId>,
    /// The stage that produced this action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_of: Option<ActionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instrument: Vec<ActionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_output_of: Option<ActionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires_completion_of: Vec<ActionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comment: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub potential_action: Vec<Action>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_time: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_time: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    /// Bare action of the given kind; the remaining header fields are empty.
    #[must_use]
    pub fn new(id: impl Into<String>, status: ActionStatus, kind: ActionKind) -> Self {
        Self {
            id: ActionId::new(id),
            status,
            agent: None,
            instrument_of: None,
            result_of: None,
            instrument: Vec::new(),
            service_output_of: None,
            requires_completion_of: Vec::new(),
            comment: Vec::new(),
            potential_action: Vec::new(),
            start_time: None,
            end_time: None,
            kind,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.kind.as_str()
    }

    #[must_use]
    pub fn as_stage(&self) -> Option<&StageBody> {
        match &self.kind {
            ActionKind::StartWorkflowStage(body) => Some(body),
            _ => None,
        }
    }

    #[must_use]
    pub fn stage_members(&self) -> &[Action] {
        self.as_stage().map_or(&[], |body| body.result.as_slice())
    }

    /// Id of the subject this action operates on, when it names one.
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Typesetting(body) => body.object.as_ref().map(|object| object.id.as_str()),
            ActionKind::Upload(body) => body.object.as_ref().map(|object| object.id.as_str()),
            ActionKind::Conversion(body) => body.object.as_deref(),
            ActionKind::Endorse(body) => Some(body.object.as_str()),
            ActionKind::Authorize(body) => body.object.as_ref().map(ActionId::as_str),
            ActionKind::Comment(body) => Some(body.object.as_str()),
            ActionKind::StartWorkflowStage(_)
            | ActionKind::CreateRelease(_)
            | ActionKind::Assess(_)
            | ActionKind::Review(_)
            | ActionKind::Declare(_)
            | ActionKind::Publish(_)
            | ActionKind::Buy(_)
            | ActionKind::Pay(_)
            | ActionKind::Update(_)
            | ActionKind::Invite(_)
            | ActionKind::Check
            | ActionKind::Inform(_) => None,
        }
    }

    #[must_use]
    pub fn is_instrument_of(&self, id: &ActionId) -> bool {
        self.instrument_of.as_ref() == Some(id)
    }
}

/// Authoritative id -> live action store for one workflow scope.
///
/// Iteration follows insertion order so that ties elsewhere resolve
/// deterministically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Action>", into = "Vec<Action>")]
pub struct ActionMap {
    actions: Vec<Action>,
    index: BTreeMap<ActionId, usize>,
}

impl ActionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from a list of live actions.
    ///
    /// # Errors
    /// Returns [`WorkflowError::Validation`] when an id is blank or repeated.
    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Result<Self, WorkflowError> {
        let mut map = Self::new();
        for action in actions {
            map.insert(action)?;
        }
        Ok(map)
    }

    /// Decodes a JSON array of actions.
    ///
    /// # Errors
    /// Returns [`WorkflowError::Snapshot`] when decoding fails and
    /// [`WorkflowError::Validation`] when ids are blank or repeated.
    pub fn from_json(value: &Value) -> Result<Self, WorkflowError> {
        let actions: Vec<Action> = serde_json::from_value(value.clone())
            .map_err(|err| WorkflowError::Snapshot(format!("invalid action list: {err}")))?;
        Self::from_actions(actions)
    }

    /// Appends one action.
    ///
    /// # Errors
    /// Returns [`WorkflowError::Validation`] when the id is blank or already present.
    pub fn insert(&mut self, action: Action) -> Result<(), WorkflowError> {
        if action.id.as_str().trim().is_empty() {
            return Err(WorkflowError::Validation(
                "action id MUST be non-empty".to_string(),
            ));
        }
        if self.index.contains_key(&action.id) {
            return Err(WorkflowError::Validation(format!(
                "duplicate action id: {}",
                action.id
            )));
        }
        self.index.insert(action.id.clone(), self.actions.len());
        self.actions.push(action);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Action> {
        self.index.get(id).and_then(|slot| self.actions.get(*slot))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<'a> IntoIterator for &'a ActionMap {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl TryFrom<Vec<Action>> for ActionMap {
    type Error = WorkflowError;

    fn try_from(value: Vec<Action>) -> Result<Self, Self::Error> {
        Self::from_actions(value)
    }
}

impl From<ActionMap> for Vec<Action> {
    fn from(value: ActionMap) -> Self {
        value.actions
    }
}

/// Comment actions keyed by id; same shape as the live action store.
pub type CommentMap = ActionMap;
