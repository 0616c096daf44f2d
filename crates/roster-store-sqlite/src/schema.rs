//! SQL schema and seed data for the Roster SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS provinces (
    id            INTEGER PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE,
    abbreviation  TEXT NOT NULL UNIQUE CHECK (length(abbreviation) = 2)
);

CREATE TABLE IF NOT EXISTS cities (
    id           INTEGER PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    province_id  INTEGER NOT NULL REFERENCES provinces(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS relationships (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

-- Ids 1-4 are fixed; business rules depend on them.
CREATE TABLE IF NOT EXISTS statuses (
    id    INTEGER PRIMARY KEY,
    name  TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS geographies (
    id        INTEGER PRIMARY KEY,
    name      TEXT NOT NULL UNIQUE,
    timezone  TEXT NOT NULL
);

-- Rows are never deleted; leaving is expressed as status + date_released.
CREATE TABLE IF NOT EXISTS employees (
    id                           INTEGER PRIMARY KEY AUTOINCREMENT,
    password                     TEXT NOT NULL,
    last_login                   TEXT,            -- RFC 3339 UTC
    date_joined                  TEXT NOT NULL,   -- RFC 3339 UTC
    email                        TEXT NOT NULL UNIQUE,
    first_name                   TEXT NOT NULL DEFAULT '',
    middle_name                  TEXT,
    last_name                    TEXT NOT NULL DEFAULT '',
    date_of_birth                TEXT,            -- YYYY-MM-DD
    sin                          TEXT,            -- plaintext, transitional
    sin_e                        TEXT,            -- base64(nonce || ciphertext)
    date_hired                   TEXT,
    date_released                TEXT,
    address                      TEXT,
    address2                     TEXT,
    city_id                      INTEGER NOT NULL REFERENCES cities(id) ON DELETE RESTRICT,
    postal_code                  TEXT,
    phone_number                 TEXT,
    extra_phone_number           TEXT,
    status_id                    INTEGER NOT NULL REFERENCES statuses(id) ON DELETE RESTRICT,
    emergency_phone_number       TEXT,
    emergency_contact_name       TEXT,
    emergency_relationship_id    INTEGER REFERENCES relationships(id) ON DELETE RESTRICT,
    iss_iat_id                   INTEGER UNIQUE CHECK (iss_iat_id >= 0),
    mss_id                       INTEGER UNIQUE CHECK (mss_id >= 0),
    salary                       TEXT,            -- decimal string
    iss_security_license_number  INTEGER CHECK (iss_security_license_number >= 0),
    iat_security_license_number  INTEGER CHECK (iat_security_license_number >= 0),
    mss_security_license_number  INTEGER CHECK (mss_security_license_number >= 0),
    notes                        TEXT,
    color                        TEXT NOT NULL,
    weekly_hours                 INTEGER NOT NULL DEFAULT 0 CHECK (weekly_hours >= 0),
    geography_id                 INTEGER NOT NULL REFERENCES geographies(id) ON DELETE RESTRICT,
    is_staff                     INTEGER NOT NULL DEFAULT 0,
    is_superuser                 INTEGER NOT NULL DEFAULT 0,
    is_active                    INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS employees_status_idx     ON employees(status_id);
CREATE INDEX IF NOT EXISTS employees_geography_idx  ON employees(geography_id);
CREATE INDEX IF NOT EXISTS employees_hired_idx      ON employees(date_hired);

PRAGMA user_version = 1;
";

/// Reference rows every store starts with. `INSERT OR IGNORE` keeps edits
/// made after the first run.
pub const SEED: &str = "
INSERT OR IGNORE INTO statuses (id, name) VALUES
    (1, 'Full time'),
    (2, 'Part time'),
    (3, 'Casual'),
    (4, 'Inactive');

INSERT OR IGNORE INTO provinces (id, name, abbreviation) VALUES
    (1,  'Nova Scotia',               'NS'),
    (2,  'New Brunswick',             'NB'),
    (3,  'Prince Edward Island',      'PE'),
    (4,  'Newfoundland and Labrador', 'NL'),
    (5,  'Quebec',                    'QC'),
    (6,  'Ontario',                   'ON'),
    (7,  'Manitoba',                  'MB'),
    (8,  'Saskatchewan',              'SK'),
    (9,  'Alberta',                   'AB'),
    (10, 'British Columbia',          'BC'),
    (11, 'Yukon',                     'YT'),
    (12, 'Northwest Territories',     'NT'),
    (13, 'Nunavut',                   'NU');

INSERT OR IGNORE INTO cities (id, name, province_id) VALUES
    (1, 'Halifax', 1);

INSERT OR IGNORE INTO relationships (id, name) VALUES
    (1, 'Spouse'),
    (2, 'Partner'),
    (3, 'Parent'),
    (4, 'Sibling'),
    (5, 'Child'),
    (6, 'Friend'),
    (7, 'Other');

INSERT OR IGNORE INTO geographies (id, name, timezone) VALUES
    (1, 'NS', 'America/Halifax');
";
