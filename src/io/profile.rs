//! Navigation profile loading: JSON Schema validation, parse, semantic
//! checks, graph build.
//!
//! The authored format mirrors what a profile editor writes: a list of states
//! with `'|'`-joined condition strings (leading `!` negates) and per-state
//! action lists. Everything structural fails fast here with
//! [`Error::ConfigInvalid`], never at drive time.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use jsonschema::Draft;
use serde::Deserialize;
use serde_json::Value;

use crate::core::graph::{Action, GraphBuilder, State, StateGraph};
use crate::core::types::{Condition, IDENTIFY_STATE, Method, StateKind};
use crate::error::{Error, Result};

const PROFILE_SCHEMA: &str = include_str!("../../schemas/profile.schema.json");

#[derive(Debug, Deserialize)]
struct ProfileDoc {
    name: String,
    states: Vec<StateDoc>,
}

#[derive(Debug, Deserialize)]
struct StateDoc {
    name: String,
    condition: String,
    #[serde(rename = "type")]
    kind: StateKind,
    actions: Vec<ActionDoc>,
}

#[derive(Debug, Deserialize)]
struct ActionDoc {
    name: String,
    method: Method,
    condition: String,
    successor: String,
    predecessor: Option<String>,
}

/// Read and build a profile from disk.
pub fn load_profile(path: &Path) -> Result<StateGraph> {
    let raw = fs::read_to_string(path)
        .map_err(|err| Error::ConfigInvalid(format!("read {}: {err}", path.display())))?;
    parse_profile(&raw)
}

/// Parse and build a profile from raw JSON: schema conformance, semantic
/// invariants, then graph materialization.
pub fn parse_profile(raw: &str) -> Result<StateGraph> {
    let instance: Value = serde_json::from_str(raw)
        .map_err(|err| Error::ConfigInvalid(format!("parse profile json: {err}")))?;
    validate_schema(&instance)?;

    let doc: ProfileDoc = serde_json::from_str(raw)
        .map_err(|err| Error::ConfigInvalid(format!("parse profile structure: {err}")))?;
    validate_semantics(&doc)?;

    let mut builder = GraphBuilder::new(doc.name);
    for state in doc.states {
        builder.add_state(State {
            name: state.name.clone(),
            kind: state.kind,
            conditions: Condition::parse_list(&state.condition),
        });
        for action in state.actions {
            builder.add_action(Action {
                name: action.name,
                source: state.name.clone(),
                successor: action.successor,
                method: action.method,
                condition: action.condition,
                predecessor: action.predecessor,
            });
        }
    }
    builder.build()
}

/// Validate the JSON instance against the embedded schema (Draft 2020-12).
fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(PROFILE_SCHEMA)
        .map_err(|err| Error::ConfigInvalid(format!("parse embedded schema: {err}")))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| Error::ConfigInvalid(format!("compile profile schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(Error::ConfigInvalid(format!(
            "schema validation failed:\n- {}",
            messages.join("\n- ")
        )));
    }
    Ok(())
}

/// Duplicate-id and reserved-name checks the schema cannot express.
///
/// Unknown successor/predecessor references are rejected by
/// [`GraphBuilder::build`]; the checks here are the ones that would otherwise
/// be silently absorbed by last-write-wins inserts.
fn validate_semantics(doc: &ProfileDoc) -> Result<()> {
    let mut state_names: HashSet<&str> = HashSet::new();
    for state in &doc.states {
        if state.name == IDENTIFY_STATE {
            return Err(Error::ConfigInvalid(format!(
                "'{IDENTIFY_STATE}' is reserved and cannot be an authored state"
            )));
        }
        if !state_names.insert(&state.name) {
            return Err(Error::ConfigInvalid(format!(
                "duplicate state '{}'",
                state.name
            )));
        }
        let mut action_names: HashSet<&str> = HashSet::new();
        for action in &state.actions {
            if !action_names.insert(&action.name) {
                return Err(Error::ConfigInvalid(format!(
                    "duplicate action '{}' in state '{}'",
                    action.name, state.name
                )));
            }
        }
    }
    Ok(())
}
