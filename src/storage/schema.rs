//! Database schema definitions for the sample entity graphs

/// Turn on foreign-key enforcement for the connection
pub const ENABLE_FOREIGN_KEYS: &str = "PRAGMA foreign_keys = ON";

/// SQL to create the classes table
pub const CREATE_CLASSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS CLASSES (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    NAME TEXT NOT NULL
)
"#;

/// SQL to create the objects table, owned by classes
pub const CREATE_OBJECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS OBJECTS (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    NAME TEXT NOT NULL,
    VALUE REAL NOT NULL,
    DATETIME TEXT,
    CLASS_ID INTEGER NOT NULL REFERENCES CLASSES(ID) ON DELETE CASCADE
)
"#;

/// SQL to create the items table
pub const CREATE_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS ITEMS (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    NAME TEXT NOT NULL,
    VALUE REAL NOT NULL,
    DATETIME TEXT
)
"#;

/// SQL to create the object/item link table
pub const CREATE_OBJECT_ITEM_LINK_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS OBJECT_ITEM_LINK (
    OBJECT_ID INTEGER NOT NULL REFERENCES OBJECTS(ID) ON DELETE CASCADE,
    ITEM_ID INTEGER NOT NULL REFERENCES ITEMS(ID) ON DELETE CASCADE
)
"#;

/// SQL to create the projects table
pub const CREATE_PROJECTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS PROJECTS (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    NAME TEXT NOT NULL,
    MANAGER TEXT NOT NULL,
    START_DATE TEXT NOT NULL,
    END_DATE TEXT,
    BUDGET REAL,
    DESCRIPTION TEXT
)
"#;

/// SQL to create the tasks table, owned by projects
pub const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS TASKS (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    NAME TEXT NOT NULL,
    RESPONSIBLE TEXT,
    DEADLINE TEXT NOT NULL,
    STATUS TEXT NOT NULL,
    PRIORITY TEXT,
    ESTIMATED_TIME TEXT,
    DESCRIPTION TEXT,
    PROJECT_ID INTEGER NOT NULL REFERENCES PROJECTS(ID) ON DELETE CASCADE
)
"#;

/// SQL to create the resources table
pub const CREATE_RESOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS RESOURCES (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    TYPE TEXT NOT NULL,
    NAME TEXT NOT NULL,
    DAILY_COST REAL,
    STATUS TEXT NOT NULL,
    SUPPLIER TEXT,
    QUANTITY INTEGER,
    ACQUISITION_DATE TEXT
)
"#;

/// SQL to create the task/resource link table
pub const CREATE_TASK_RESOURCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS TASK_RESOURCE (
    TASK_ID INTEGER NOT NULL REFERENCES TASKS(ID) ON DELETE CASCADE,
    RESOURCE_ID INTEGER NOT NULL REFERENCES RESOURCES(ID) ON DELETE CASCADE
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_objects_class ON OBJECTS(CLASS_ID)",
    "CREATE INDEX IF NOT EXISTS idx_object_item_object ON OBJECT_ITEM_LINK(OBJECT_ID)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project ON TASKS(PROJECT_ID)",
    "CREATE INDEX IF NOT EXISTS idx_task_resource_task ON TASK_RESOURCE(TASK_ID)",
];

/// Tables in dependency order: link tables, then children, then roots
pub const CLEAR_ORDER: &[&str] = &[
    "OBJECT_ITEM_LINK",
    "TASK_RESOURCE",
    "OBJECTS",
    "TASKS",
    "ITEMS",
    "RESOURCES",
    "CLASSES",
    "PROJECTS",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_CLASSES_TABLE,
        CREATE_OBJECTS_TABLE,
        CREATE_ITEMS_TABLE,
        CREATE_OBJECT_ITEM_LINK_TABLE,
        CREATE_PROJECTS_TABLE,
        CREATE_TASKS_TABLE,
        CREATE_RESOURCES_TABLE,
        CREATE_TASK_RESOURCE_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
