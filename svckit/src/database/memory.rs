// svckit/src/database/memory.rs
//
// In-memory CQL cluster for local runs and tests.
// Understands the statement shapes issued by the schema bootstrapper, the
// repositories and the health probe, and enforces the CQL rules they rely on:
// keyspace binding, duplicate keyspace creation, filtering on non-key columns,
// counter-only tables. Every statement runs under one lock, so a counter
// increment is atomic with respect to concurrent increments.
//

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info};

use crate::errors::DataError;
use crate::types::{ColumnValue, Row};
use super::session::{CqlSession, SessionConnector};

pub const MEMORY_RELEASE_VERSION: &str = "4.1.0-memory";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
    static ref CREATE_KEYSPACE: Regex =
        Regex::new(r"(?i)^CREATE KEYSPACE (IF NOT EXISTS )?(\w+) WITH .+$").expect("valid regex");
    static ref CREATE_TABLE: Regex =
        Regex::new(r"(?i)^CREATE TABLE (IF NOT EXISTS )?([\w.]+) ?\((.+)\)$").expect("valid regex");
    static ref CREATE_INDEX: Regex =
        Regex::new(r"(?i)^CREATE INDEX (IF NOT EXISTS )?(?:(\w+) )?ON ([\w.]+) ?\( ?(\w+) ?\)$").expect("valid regex");
    static ref INSERT: Regex =
        Regex::new(r"(?i)^INSERT INTO ([\w.]+) ?\(([^)]*)\) ?VALUES ?\(([^)]*)\)$").expect("valid regex");
    static ref SELECT: Regex = Regex::new(
        r"(?i)^SELECT (.+?) FROM ([\w.]+)(?: WHERE (\w+) ?= ?\?)?(?: LIMIT (\d+))?( ALLOW FILTERING)?$"
    )
    .expect("valid regex");
    static ref UPDATE: Regex =
        Regex::new(r"(?i)^UPDATE ([\w.]+) SET (.+?) WHERE (\w+) ?= ?\?$").expect("valid regex");
    static ref DELETE: Regex =
        Regex::new(r"(?i)^DELETE FROM ([\w.]+) WHERE (\w+) ?= ?\?$").expect("valid regex");
    static ref COUNTER_ASSIGN: Regex =
        Regex::new(r"(?i)^(\w+) ?= ?(\w+) ?([+-]) ?(\?|\d+)$").expect("valid regex");
    static ref ASSIGN: Regex = Regex::new(r"(?i)^(\w+) ?= ?\?$").expect("valid regex");
}

#[derive(Debug, Clone)]
struct ColumnDef {
    name: String,
    cql_type: String,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<ColumnDef>,
    primary_key: String,
    indexes: BTreeMap<String, String>,
    rows: Vec<HashMap<String, ColumnValue>>,
}

impl Table {
    fn column(&self, name: &str) -> Result<&ColumnDef, DataError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| db_error(format!("Undefined column name {}", name)))
    }

    fn is_counter_table(&self) -> bool {
        self.columns.iter().any(|c| c.cql_type == "counter")
    }

    fn is_indexed(&self, column: &str) -> bool {
        self.indexes.values().any(|c| c == column)
    }

    fn find_row(&self, key: &ColumnValue) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.get(&self.primary_key) == Some(key))
    }

    fn describe(&self, keyspace: &str, name: &str) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.cql_type))
            .collect();
        let indexes: Vec<String> = self
            .indexes
            .iter()
            .map(|(index, column)| format!("{}({})", index, column))
            .collect();
        format!(
            "{}.{} ({}) PRIMARY KEY ({}) INDEXES [{}]",
            keyspace,
            name,
            columns.join(", "),
            self.primary_key,
            indexes.join(", ")
        )
    }
}

#[derive(Debug, Default)]
struct KeyspaceState {
    replication: String,
    tables: BTreeMap<String, Table>,
}

#[derive(Debug, Default)]
struct ClusterState {
    keyspaces: BTreeMap<String, KeyspaceState>,
}

/// Shared in-memory cluster. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            cluster: self.clone(),
        }
    }

    pub fn has_keyspace(&self, keyspace: &str) -> bool {
        self.state.lock().keyspaces.contains_key(keyspace)
    }

    /// Replication clause the keyspace was created with
    pub fn keyspace_replication(&self, keyspace: &str) -> Option<String> {
        self.state
            .lock()
            .keyspaces
            .get(keyspace)
            .map(|ks| ks.replication.clone())
    }

    /// One line per table describing columns, key and indexes, sorted by table name
    pub fn schema_snapshot(&self, keyspace: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .keyspaces
            .get(keyspace)
            .map(|ks| {
                ks.tables
                    .iter()
                    .map(|(name, table)| table.describe(keyspace, name))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn row_count(&self, keyspace: &str, table: &str) -> usize {
        let state = self.state.lock();
        state
            .keyspaces
            .get(keyspace)
            .and_then(|ks| ks.tables.get(table))
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    fn apply(&self, bound_keyspace: Option<&str>, cql: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
        let statement = normalize(cql);
        debug!("memory cluster executing: {}", statement);
        let mut state = self.state.lock();

        if let Some(caps) = CREATE_KEYSPACE.captures(&statement) {
            return state.create_keyspace(caps.get(1).is_some(), &caps[2], &statement);
        }
        if let Some(caps) = CREATE_TABLE.captures(&statement) {
            let (keyspace, table) = resolve(&caps[2], bound_keyspace)?;
            return state.create_table(caps.get(1).is_some(), &keyspace, &table, &caps[3]);
        }
        if let Some(caps) = CREATE_INDEX.captures(&statement) {
            let (keyspace, table) = resolve(&caps[3], bound_keyspace)?;
            let name = caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| format!("{}_{}_idx", table, &caps[4]));
            return state.create_index(caps.get(1).is_some(), &keyspace, &table, &name, &caps[4]);
        }
        if let Some(caps) = INSERT.captures(&statement) {
            let (keyspace, table) = resolve(&caps[1], bound_keyspace)?;
            let table = state.table_mut(&keyspace, &table)?;
            return insert(table, &caps[2], &caps[3], values);
        }
        if let Some(caps) = SELECT.captures(&statement) {
            if caps[2].eq_ignore_ascii_case("system.local") {
                return system_local(&caps[1]);
            }
            let (keyspace, table) = resolve(&caps[2], bound_keyspace)?;
            let table = state.table_mut(&keyspace, &table)?;
            let limit = caps
                .get(4)
                .map(|m| m.as_str().parse::<usize>())
                .transpose()
                .map_err(|e| db_error(format!("Invalid LIMIT: {}", e)))?;
            return select(
                table,
                &caps[1],
                caps.get(3).map(|m| m.as_str()),
                limit,
                caps.get(5).is_some(),
                values,
            );
        }
        if let Some(caps) = UPDATE.captures(&statement) {
            let (keyspace, table) = resolve(&caps[1], bound_keyspace)?;
            let table = state.table_mut(&keyspace, &table)?;
            return update(table, &caps[2], &caps[3], values);
        }
        if let Some(caps) = DELETE.captures(&statement) {
            let (keyspace, table) = resolve(&caps[1], bound_keyspace)?;
            let table = state.table_mut(&keyspace, &table)?;
            return delete(table, &caps[2], values);
        }

        Err(db_error(format!("Unsupported statement: {}", statement)))
    }
}

impl ClusterState {
    fn create_keyspace(&mut self, if_not_exists: bool, keyspace: &str, statement: &str) -> Result<Vec<Row>, DataError> {
        if self.keyspaces.contains_key(keyspace) {
            if if_not_exists {
                return Ok(vec![]);
            }
            return Err(db_error(format!("Keyspace {} already exists", keyspace)));
        }
        let replication = statement
            .split_once(" WITH ")
            .map(|(_, r)| r.to_string())
            .unwrap_or_default();
        self.keyspaces.insert(
            keyspace.to_string(),
            KeyspaceState {
                replication,
                tables: BTreeMap::new(),
            },
        );
        Ok(vec![])
    }

    fn keyspace_mut(&mut self, keyspace: &str) -> Result<&mut KeyspaceState, DataError> {
        self.keyspaces
            .get_mut(keyspace)
            .ok_or_else(|| db_error(format!("Keyspace {} does not exist", keyspace)))
    }

    fn table_mut(&mut self, keyspace: &str, table: &str) -> Result<&mut Table, DataError> {
        self.keyspace_mut(keyspace)?
            .tables
            .get_mut(table)
            .ok_or_else(|| db_error(format!("unconfigured table {}", table)))
    }

    fn create_table(&mut self, if_not_exists: bool, keyspace: &str, name: &str, body: &str) -> Result<Vec<Row>, DataError> {
        let ks = self.keyspace_mut(keyspace)?;
        if ks.tables.contains_key(name) {
            if if_not_exists {
                return Ok(vec![]);
            }
            return Err(db_error(format!("Table {}.{} already exists", keyspace, name)));
        }

        let mut table = Table::default();
        for definition in split_top_level(body) {
            let tokens: Vec<&str> = definition.split_whitespace().collect();
            if tokens.len() < 2 {
                return Err(db_error(format!("Invalid column definition: {}", definition)));
            }
            if tokens[0].eq_ignore_ascii_case("PRIMARY") {
                let inner = definition
                    .split_once('(')
                    .and_then(|(_, rest)| rest.rsplit_once(')'))
                    .map(|(inner, _)| inner.trim())
                    .ok_or_else(|| db_error(format!("Invalid PRIMARY KEY clause: {}", definition)))?;
                if inner.contains(',') || inner.contains('(') {
                    return Err(db_error("Compound primary keys are not supported by the memory cluster"));
                }
                table.primary_key = inner.to_string();
                continue;
            }
            let column = ColumnDef {
                name: tokens[0].to_string(),
                cql_type: tokens[1].to_lowercase(),
            };
            let rest = tokens[2..].join(" ");
            if rest.eq_ignore_ascii_case("PRIMARY KEY") {
                table.primary_key = column.name.clone();
            }
            table.columns.push(column);
        }

        if table.primary_key.is_empty() {
            return Err(db_error(format!("No PRIMARY KEY specified for table {}", name)));
        }
        if table.column(&table.primary_key)?.cql_type == "counter" {
            return Err(db_error(format!(
                "counter type is not supported for PRIMARY KEY part {}",
                table.primary_key
            )));
        }

        let counters = table.columns.iter().filter(|c| c.cql_type == "counter").count();
        let regular = table.columns.len().saturating_sub(counters + 1);
        if counters > 0 && regular > 0 {
            return Err(db_error("Cannot mix counter and non counter columns in the same table"));
        }

        info!("memory cluster created table {}.{}", keyspace, name);
        ks.tables.insert(name.to_string(), table);
        Ok(vec![])
    }

    fn create_index(&mut self, if_not_exists: bool, keyspace: &str, table_name: &str, index: &str, column: &str) -> Result<Vec<Row>, DataError> {
        let ks = self.keyspace_mut(keyspace)?;
        let duplicate = ks.tables.values().any(|t| t.indexes.contains_key(index));
        let table = ks
            .tables
            .get_mut(table_name)
            .ok_or_else(|| db_error(format!("unconfigured table {}", table_name)))?;
        if duplicate {
            if if_not_exists {
                return Ok(vec![]);
            }
            return Err(db_error(format!("Index {} already exists", index)));
        }
        table.column(column)?;
        if table.primary_key == column {
            return Err(db_error(format!(
                "Cannot create secondary index on partition key column {}",
                column
            )));
        }
        table.indexes.insert(index.to_string(), column.to_string());
        Ok(vec![])
    }
}

fn insert(table: &mut Table, columns: &str, markers: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
    if table.is_counter_table() {
        return Err(db_error("INSERT statements are not allowed on counter tables, use UPDATE instead"));
    }
    let columns: Vec<&str> = columns.split(',').map(str::trim).collect();
    let markers: Vec<&str> = markers.split(',').map(str::trim).collect();
    if markers.iter().any(|m| *m != "?") {
        return Err(db_error("Only bind markers are accepted in VALUES"));
    }
    if columns.len() != markers.len() || markers.len() != values.len() {
        return Err(db_error(format!(
            "Expected {} bound values, got {}",
            columns.len(),
            values.len()
        )));
    }

    let mut cells = HashMap::new();
    for (column, value) in columns.iter().zip(values) {
        check_type(table.column(column)?, &value)?;
        cells.insert(column.to_string(), value);
    }
    let key = match cells.get(&table.primary_key) {
        Some(key) if !key.is_null() => key.clone(),
        _ => return Err(db_error(format!("Missing PRIMARY KEY part {}", table.primary_key))),
    };

    match table.find_row(&key) {
        Some(idx) => {
            let row = &mut table.rows[idx];
            for (column, value) in cells {
                if value.is_null() {
                    row.remove(&column);
                } else {
                    row.insert(column, value);
                }
            }
        }
        None => {
            cells.retain(|_, v| !v.is_null());
            table.rows.push(cells);
        }
    }
    Ok(vec![])
}

fn select(
    table: &Table,
    projection: &str,
    filter_column: Option<&str>,
    limit: Option<usize>,
    allow_filtering: bool,
    values: Vec<ColumnValue>,
) -> Result<Vec<Row>, DataError> {
    let columns: Vec<String> = if projection.trim() == "*" {
        table.columns.iter().map(|c| c.name.clone()).collect()
    } else {
        projection.split(',').map(|c| c.trim().to_string()).collect()
    };
    for column in &columns {
        table.column(column)?;
    }

    let filter = match filter_column {
        Some(column) => {
            table.column(column)?;
            if column != table.primary_key && !table.is_indexed(column) && !allow_filtering {
                return Err(db_error(
                    "Cannot execute this query as it might involve data filtering and thus may have \
                     unpredictable performance. If you want to execute this query despite the \
                     performance unpredictability, use ALLOW FILTERING",
                ));
            }
            let value = single_value(values)?;
            Some((column, value))
        }
        None => {
            if !values.is_empty() {
                return Err(db_error(format!("Expected 0 bound values, got {}", values.len())));
            }
            None
        }
    };

    let rows = table
        .rows
        .iter()
        .filter(|row| match &filter {
            Some((column, value)) => row.get(*column) == Some(value),
            None => true,
        })
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).cloned().unwrap_or(ColumnValue::Null))
                .collect()
        })
        .collect();
    Ok(rows)
}

enum Assignment {
    Set(String),
    Add(String, Option<i64>),
}

fn update(table: &mut Table, assignments: &str, key_column: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
    if key_column != table.primary_key {
        return Err(db_error(format!(
            "Cannot update without the full PRIMARY KEY; {} is not the key",
            key_column
        )));
    }

    let mut parsed = Vec::new();
    for assignment in split_top_level(assignments) {
        if let Some(caps) = COUNTER_ASSIGN.captures(&assignment) {
            if caps[1] != caps[2] {
                return Err(db_error(format!("Invalid operation ({}) for non counter column", assignment)));
            }
            let column = table.column(&caps[1])?;
            if column.cql_type != "counter" {
                return Err(db_error(format!("Invalid operation ({}) for non counter column {}", assignment, &caps[1])));
            }
            let literal = if &caps[4] == "?" {
                None
            } else {
                Some(caps[4].parse::<i64>().map_err(|e| db_error(e.to_string()))?)
            };
            let literal = literal.map(|n| if &caps[3] == "-" { -n } else { n });
            if literal.is_none() && &caps[3] == "-" {
                return Err(db_error("Bound counter decrements are not supported"));
            }
            parsed.push(Assignment::Add(caps[1].to_string(), literal));
        } else if let Some(caps) = ASSIGN.captures(&assignment) {
            let column = table.column(&caps[1])?;
            if column.name == table.primary_key {
                return Err(db_error(format!("PRIMARY KEY part {} found in SET part", column.name)));
            }
            if column.cql_type == "counter" {
                return Err(db_error(format!(
                    "Cannot set the value of counter column {} (counters can only be incremented/decremented, not set)",
                    column.name
                )));
            }
            parsed.push(Assignment::Set(caps[1].to_string()));
        } else {
            return Err(db_error(format!("Unsupported assignment: {}", assignment)));
        }
    }

    let expected = parsed
        .iter()
        .filter(|a| matches!(a, Assignment::Set(_) | Assignment::Add(_, None)))
        .count()
        + 1;
    if values.len() != expected {
        return Err(db_error(format!("Expected {} bound values, got {}", expected, values.len())));
    }
    let mut values = values.into_iter();
    let mut bound = Vec::with_capacity(parsed.len());
    for assignment in &parsed {
        match assignment {
            Assignment::Set(column) => {
                let value = values.next().unwrap_or(ColumnValue::Null);
                check_type(table.column(column)?, &value)?;
                bound.push((column.clone(), Some(value), 0));
            }
            Assignment::Add(column, Some(delta)) => bound.push((column.clone(), None, *delta)),
            Assignment::Add(column, None) => {
                let value = values.next().unwrap_or(ColumnValue::Null);
                let delta = value
                    .as_i64()
                    .ok_or_else(|| db_error(format!("Invalid counter delta {}", value)))?;
                bound.push((column.clone(), None, delta));
            }
        }
    }
    let key = values.next().unwrap_or(ColumnValue::Null);
    check_type(table.column(key_column)?, &key)?;
    if key.is_null() {
        return Err(db_error(format!("Invalid null value for PRIMARY KEY part {}", key_column)));
    }

    let idx = match table.find_row(&key) {
        Some(idx) => idx,
        None => {
            let mut row = HashMap::new();
            row.insert(table.primary_key.clone(), key);
            table.rows.push(row);
            table.rows.len() - 1
        }
    };
    let row = &mut table.rows[idx];
    for (column, value, delta) in bound {
        match value {
            Some(ColumnValue::Null) => {
                row.remove(&column);
            }
            Some(value) => {
                row.insert(column, value);
            }
            None => {
                let current = row.get(&column).and_then(ColumnValue::as_i64).unwrap_or(0);
                row.insert(column, ColumnValue::BigInt(current + delta));
            }
        }
    }
    Ok(vec![])
}

fn delete(table: &mut Table, key_column: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
    if key_column != table.primary_key {
        return Err(db_error(format!("Cannot delete by non-key column {}", key_column)));
    }
    let key = single_value(values)?;
    check_type(table.column(key_column)?, &key)?;
    table.rows.retain(|row| row.get(key_column) != Some(&key));
    Ok(vec![])
}

fn system_local(projection: &str) -> Result<Vec<Row>, DataError> {
    let row = projection
        .split(',')
        .map(|column| match column.trim() {
            "release_version" => Ok(ColumnValue::Text(MEMORY_RELEASE_VERSION.to_string())),
            "cluster_name" => Ok(ColumnValue::Text("memory".to_string())),
            other => Err(db_error(format!("Undefined column name {} in system.local", other))),
        })
        .collect::<Result<Row, DataError>>()?;
    Ok(vec![row])
}

fn check_type(column: &ColumnDef, value: &ColumnValue) -> Result<(), DataError> {
    let ok = match (column.cql_type.as_str(), value) {
        (_, ColumnValue::Null) => true,
        ("text" | "varchar" | "ascii", ColumnValue::Text(_)) => true,
        ("uuid" | "timeuuid", ColumnValue::Uuid(_)) => true,
        ("timestamp", ColumnValue::Timestamp(_)) => true,
        ("int", ColumnValue::Int(_)) => true,
        ("bigint" | "counter", ColumnValue::BigInt(_) | ColumnValue::Int(_)) => true,
        ("boolean", ColumnValue::Boolean(_)) => true,
        ("double", ColumnValue::Double(_)) => true,
        ("float", ColumnValue::Float(_)) => true,
        ("blob", ColumnValue::Blob(_)) => true,
        (t, ColumnValue::List(_)) if t.starts_with("list") || t.starts_with("set") => true,
        (t, ColumnValue::Map(_)) if t.starts_with("map") => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(db_error(format!(
            "Invalid type for column {}: expected {}, got {}",
            column.name,
            column.cql_type,
            value.type_name()
        )))
    }
}

fn single_value(values: Vec<ColumnValue>) -> Result<ColumnValue, DataError> {
    let count = values.len();
    let mut values = values.into_iter();
    match (values.next(), count) {
        (Some(value), 1) => Ok(value),
        _ => Err(db_error(format!("Expected 1 bound value, got {}", count))),
    }
}

fn resolve(name: &str, bound_keyspace: Option<&str>) -> Result<(String, String), DataError> {
    match name.split_once('.') {
        Some((keyspace, table)) => Ok((keyspace.to_string(), table.to_string())),
        None => bound_keyspace
            .map(|keyspace| (keyspace.to_string(), name.to_string()))
            .ok_or_else(|| {
                db_error("No keyspace has been specified. USE a keyspace, or explicitly specify keyspace.tablename")
            }),
    }
}

/// Split on commas that are not nested inside parentheses or angle brackets
fn split_top_level(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in input.chars() {
        match ch {
            '(' | '<' => depth += 1,
            ')' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn normalize(cql: &str) -> String {
    let collapsed = WHITESPACE.replace_all(cql.trim(), " ");
    collapsed.trim_end_matches(';').trim().to_string()
}

fn db_error(message: impl Into<String>) -> DataError {
    DataError::DatabaseError(message.into())
}

/// Connector handing out sessions on a shared [`MemoryCluster`]
#[derive(Clone)]
pub struct MemoryConnector {
    cluster: MemoryCluster,
}

#[async_trait]
impl SessionConnector for MemoryConnector {
    async fn connect(&self, keyspace: Option<&str>) -> Result<Arc<dyn CqlSession>, DataError> {
        if let Some(keyspace) = keyspace {
            if !self.cluster.has_keyspace(keyspace) {
                return Err(DataError::ConnectionError(format!(
                    "Keyspace '{}' does not exist",
                    keyspace
                )));
            }
        }
        Ok(Arc::new(MemorySession {
            cluster: self.cluster.clone(),
            keyspace: keyspace.map(str::to_string),
            closed: AtomicBool::new(false),
        }))
    }

    fn driver_name(&self) -> &str {
        "memory"
    }
}

pub struct MemorySession {
    cluster: MemoryCluster,
    keyspace: Option<String>,
    closed: AtomicBool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), DataError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DataError::AlreadyClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl CqlSession for MemorySession {
    async fn execute(&self, cql: &str, values: Vec<ColumnValue>) -> Result<(), DataError> {
        self.ensure_open()?;
        self.cluster.apply(self.keyspace.as_deref(), cql, values)?;
        Ok(())
    }

    async fn query(&self, cql: &str, values: Vec<ColumnValue>) -> Result<Vec<Row>, DataError> {
        self.ensure_open()?;
        self.cluster.apply(self.keyspace.as_deref(), cql, values)
    }

    async fn keyspace_exists(&self, keyspace: &str) -> Result<bool, DataError> {
        self.ensure_open()?;
        Ok(self.cluster.has_keyspace(keyspace))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn driver_name(&self) -> &str {
        "memory"
    }
}
