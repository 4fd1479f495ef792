//! Reserved word lists.
//!
//! Aliases are quoted everywhere, but drivers and older servers still choke on
//! a handful of keywords used as identifiers. Lists are upper case.

use std::collections::HashSet;

use once_cell::sync::Lazy;

/// SQL-92 core keywords every dialect treats as reserved.
static COMMON: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST",
        "CHECK", "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE",
        "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "DATE", "DEFAULT", "DELETE", "DESC",
        "DISTINCT", "DROP", "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR",
        "FOREIGN", "FROM", "FULL", "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INNER", "INSERT",
        "INTERSECT", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "NOT", "NULL", "OF", "OFFSET",
        "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "ROWS", "SELECT", "SET",
        "SOME", "TABLE", "THEN", "TO", "TRUE", "UNION", "UNIQUE", "UPDATE", "USER", "USING",
        "VALUE", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
    ]
    .into_iter()
    .collect()
});

static MYSQL: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ACCESSIBLE", "ANALYZE", "CHANGE", "CONDITION", "DATABASE", "DATABASES", "DIV", "DUAL",
        "ELSEIF", "ENCLOSED", "ESCAPED", "EXPLAIN", "FULLTEXT", "GROUPS", "IGNORE", "INTERVAL",
        "KEYS", "KILL", "LIMIT", "LINES", "LOAD", "LOCK", "LONG", "MATCH", "MOD", "OPTION",
        "OUTFILE", "RANGE", "RANK", "READ", "REGEXP", "RENAME", "REPEAT", "REPLACE", "REQUIRE",
        "RLIKE", "ROW", "ROW_NUMBER", "SCHEMA", "SEPARATOR", "SHOW", "SPATIAL", "SQL",
        "STARTING", "SYSTEM", "TERMINATED", "UNLOCK", "UNSIGNED", "USAGE", "WINDOW", "WRITE",
        "XOR", "ZEROFILL",
    ]
    .into_iter()
    .collect()
});

static MSSQL: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "BACKUP", "BREAK", "BROWSE", "BULK", "CHECKPOINT", "CLUSTERED", "COMPUTE", "CONTAINS",
        "CONTINUE", "DATABASE", "DBCC", "DENY", "DISK", "DUMP", "ERRLVL", "EXEC", "EXECUTE",
        "EXIT", "FILE", "FILLFACTOR", "FREETEXT", "FUNCTION", "GOTO", "HOLDLOCK", "IDENTITY",
        "IF", "KILL", "LINENO", "MERGE", "NOCHECK", "NONCLUSTERED", "OPEN", "OPENQUERY",
        "OPTION", "OVER", "PERCENT", "PIVOT", "PLAN", "PRINT", "PROC", "PROCEDURE", "PUBLIC",
        "RAISERROR", "READ", "RESTORE", "RETURN", "REVERT", "ROWCOUNT", "RULE", "SAVE",
        "SCHEMA", "SHUTDOWN", "STATISTICS", "TOP", "TRAN", "TRANSACTION", "TRIGGER", "TRUNCATE",
        "TSEQUAL", "UNPIVOT", "USE", "WAITFOR", "WHILE",
    ]
    .into_iter()
    .collect()
});

static POSTGRES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ANALYSE", "ANALYZE", "ARRAY", "ASYMMETRIC", "BOTH", "COLLATE", "CONCURRENTLY", "DO",
        "FREEZE", "ILIKE", "INITIALLY", "ISNULL", "LATERAL", "LEADING", "LIMIT", "LOCALTIME",
        "LOCALTIMESTAMP", "NOTNULL", "ONLY", "OVERLAPS", "PLACING", "RETURNING", "SIMILAR",
        "SYMMETRIC", "TRAILING", "VARIADIC", "VERBOSE", "WINDOW",
    ]
    .into_iter()
    .collect()
});

static ORACLE: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ACCESS", "AUDIT", "CLUSTER", "COMMENT", "COMPRESS", "CONNECT", "EXCLUSIVE", "FILE",
        "IDENTIFIED", "IMMEDIATE", "INCREMENT", "INITIAL", "LEVEL", "LOCK", "LONG", "MAXEXTENTS",
        "MINUS", "MLSLABEL", "MODE", "MODIFY", "NOAUDIT", "NOCOMPRESS", "NOWAIT", "NUMBER",
        "OFFLINE", "ONLINE", "OPTION", "PCTFREE", "PRIOR", "RAW", "RENAME", "RESOURCE",
        "REVOKE", "ROW", "ROWID", "ROWNUM", "SESSION", "SHARE", "SIZE", "SMALLINT", "START",
        "SUCCESSFUL", "SYNONYM", "SYSDATE", "TRIGGER", "UID", "VALIDATE", "VARCHAR",
        "VARCHAR2", "WHENEVER",
    ]
    .into_iter()
    .collect()
});

static HANA: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "CURRENT_CONNECTION", "CURRENT_SCHEMA", "CURRENT_UTCDATE", "CURRENT_UTCTIME",
        "CURRENT_UTCTIMESTAMP", "CURRVAL", "CURSOR", "DUMMY", "LIMIT", "MINUS", "NEXTVAL",
        "ROWID", "ROWNUM", "SYSUUID", "TOP", "UNNEST",
    ]
    .into_iter()
    .collect()
});

fn contains(set: &HashSet<&'static str>, word: &str) -> bool {
    set.contains(word.to_ascii_uppercase().as_str())
}

pub fn is_common(word: &str) -> bool {
    contains(&COMMON, word)
}

pub fn is_mysql(word: &str) -> bool {
    is_common(word) || contains(&MYSQL, word)
}

pub fn is_mssql(word: &str) -> bool {
    is_common(word) || contains(&MSSQL, word)
}

pub fn is_postgres(word: &str) -> bool {
    is_common(word) || contains(&POSTGRES, word)
}

pub fn is_oracle(word: &str) -> bool {
    is_common(word) || contains(&ORACLE, word)
}

pub fn is_hana(word: &str) -> bool {
    is_common(word) || contains(&HANA, word)
}
