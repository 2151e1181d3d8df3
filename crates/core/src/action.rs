//! Request and response contracts for calling an action.
//!
//! The dispatcher that routes requests lives outside this crate. These
//! methods cover the parts that depend on the type model: decoding and
//! validating input, and checking a handler's response before it is sent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::json::parse_json;
use crate::model::validate::Validator;
use crate::model::{
    Action, BuiltinType, MemberPath, StructMember, StructType, TypeGraph, TypeRef, ValidationMode,
    Value,
};
use crate::query_string;

/// Query-string key naming a JSONP callback; never part of the input.
pub const JSONP: &str = "jsonp";

/// Error response of an action call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{error}{}", .message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
pub struct ActionError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<String>,
}

impl ActionError {
    pub fn new(error: impl Into<String>, message: Option<String>) -> Self {
        ActionError {
            error: error.into(),
            message,
            member: None,
        }
    }

    fn invalid_input(message: impl Into<String>) -> Self {
        ActionError::new("InvalidInput", Some(message.into()))
    }

    fn from_validation(error: &str, err: ValidationError) -> Self {
        ActionError {
            error: error.to_owned(),
            message: Some(err.message),
            member: err.member,
        }
    }

    /// The response body: `{"error": ..., "message": ..., "member": ...}`.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("error".to_owned(), Value::from(self.error.as_str()));
        if let Some(message) = &self.message {
            map.insert("message".to_owned(), Value::from(message.as_str()));
        }
        if let Some(member) = &self.member {
            map.insert("member".to_owned(), Value::from(member.as_str()));
        }
        Value::Map(map)
    }
}

impl Action {
    /// Decode and validate input from a query string.
    ///
    /// A `jsonp` member is removed before validation; the callback name is
    /// returned alongside the validated input.
    pub fn decode_query_input(
        &self,
        graph: &TypeGraph,
        query: &str,
        url_args: Option<&BTreeMap<String, String>>,
    ) -> Result<(Value, Option<String>), ActionError> {
        let mut request = query_string::decode(query).map_err(|err| {
            tracing::warn!(action = %self.name, query, "error decoding query string");
            ActionError::invalid_input(err.to_string())
        })?;

        let jsonp = match &mut request {
            Value::Map(map) => map.remove(JSONP).and_then(|v| v.to_plain_string()),
            _ => None,
        };

        let request = self.merge_url_args(request, url_args)?;
        let value = self.validate_input(graph, &request, ValidationMode::QueryString)?;
        Ok((value, jsonp))
    }

    /// Decode and validate a JSON request body.
    ///
    /// Merged URL arguments are strings, so their presence switches
    /// validation to query-string mode.
    pub fn decode_json_input(
        &self,
        graph: &TypeGraph,
        body: &str,
        url_args: Option<&BTreeMap<String, String>>,
    ) -> Result<Value, ActionError> {
        let request = parse_json(body).map_err(|err| {
            tracing::warn!(action = %self.name, "error decoding JSON content");
            ActionError::invalid_input(format!("Invalid request JSON: {}", err))
        })?;

        let mode = if url_args.is_some() {
            ValidationMode::QueryString
        } else {
            ValidationMode::JsonInput
        };
        let request = self.merge_url_args(request, url_args)?;
        self.validate_input(graph, &request, mode)
    }

    /// Check a handler response before it is serialized.
    ///
    /// A map with an `error` key must be a valid error response for this
    /// action; anything else must match the output type.
    pub fn check_output(&self, graph: &TypeGraph, response: &Value) -> Result<(), ActionError> {
        let validator = Validator {
            graph,
            mode: ValidationMode::JsonOutput,
        };
        let mut path = MemberPath::root();
        let is_error = response
            .as_map()
            .is_some_and(|map| map.contains_key("error"));

        let result = if is_error {
            validator.validate_struct(&self.error_response_type(), response, &mut path)
        } else {
            validator.validate(&TypeRef::User(self.output), response, &mut path)
        };

        result.map(|_| ()).map_err(|err| {
            tracing::warn!(action = %self.name, error = %err, "invalid output returned from action");
            ActionError::from_validation("InvalidOutput", err)
        })
    }

    fn merge_url_args(
        &self,
        mut request: Value,
        url_args: Option<&BTreeMap<String, String>>,
    ) -> Result<Value, ActionError> {
        let (Some(args), Value::Map(map)) = (url_args, &mut request) else {
            return Ok(request);
        };
        for (name, value) in args {
            if map.contains_key(name) || name == JSONP {
                tracing::warn!(action = %self.name, member = %name, "duplicate URL argument member");
                return Err(ActionError::invalid_input(format!(
                    "Duplicate URL argument member '{}'",
                    name
                )));
            }
            map.insert(name.clone(), Value::from(value.as_str()));
        }
        Ok(request)
    }

    fn validate_input(
        &self,
        graph: &TypeGraph,
        request: &Value,
        mode: ValidationMode,
    ) -> Result<Value, ActionError> {
        graph
            .validate(&TypeRef::User(self.input), request, mode)
            .map(|value| value.into_owned())
            .map_err(|err| {
                tracing::warn!(action = %self.name, error = %err, "invalid input for action");
                ActionError::from_validation("InvalidInput", err)
            })
    }

    fn error_response_type(&self) -> StructType {
        let member = |name: &str, ty: TypeRef, optional: bool| StructMember {
            name: name.to_owned(),
            ty,
            optional,
            nullable: false,
            attr: None,
            doc: Vec::new(),
        };
        StructType {
            name: "struct".to_owned(),
            union: false,
            members: vec![
                member("error", TypeRef::User(self.errors), false),
                member("message", TypeRef::Builtin(BuiltinType::String), true),
            ],
            base_types: Vec::new(),
            doc: Vec::new(),
            own_start: 0,
        }
    }
}
