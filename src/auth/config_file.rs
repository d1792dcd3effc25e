//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::auth::file_utils::expand_user_home;
use crate::error::{ia_err, DaoError};
use ini::Ini;

pub(crate) const DEFAULT_CONFIG_FILE_PATH: &str = "~/.personium/config";
const BASE_URL: &str = "base_url";
const CELL: &str = "cell";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const VERSION: &str = "version";

/// Values read from one profile of a config file.
///
/// The file uses the INI format, one profile per section:
/// ```ini
/// [DEFAULT]
/// base_url=https://personium.example.com
/// cell=app-cell
/// username=service-user
/// password=secret
/// version=1.7
/// ```
/// `username` and `password` are the service-subject credentials used by
/// [`Credential::ServiceSubject`](crate::Credential::ServiceSubject).
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ConfigProfile {
    pub(crate) base_url: String,
    pub(crate) cell: Option<String>,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) version: Option<String>,
}

fn get_section_variable(
    file: &str,
    props: &ini::Properties,
    var: &str,
) -> Result<String, DaoError> {
    match props.get(var) {
        Some(v) => Ok(v.to_string()),
        None => ia_err!("error reading config file '{}': missing field '{}'", file, var),
    }
}

impl ConfigProfile {
    pub(crate) fn load(config_file_path: &str, profile_name: &str) -> Result<Self, DaoError> {
        tracing::debug!(
            "Reading dao configuration from file {} and profile {}",
            config_file_path,
            profile_name
        );
        let file_path = expand_user_home(config_file_path)?;
        let config = Ini::load_from_file(&file_path)?;
        let props = match config.section(Some(profile_name)) {
            Some(p) => p,
            None => {
                return ia_err!(
                    "error reading config file '{}': missing profile '{}'",
                    file_path,
                    profile_name
                );
            }
        };

        let base_url = get_section_variable(&file_path, props, BASE_URL)?;
        let profile = ConfigProfile {
            base_url,
            cell: props.get(CELL).map(|s| s.to_string()),
            username: props.get(USERNAME).map(|s| s.to_string()),
            password: props.get(PASSWORD).map(|s| s.to_string()),
            version: props.get(VERSION).map(|s| s.to_string()),
        };
        if profile.username.is_some() != profile.password.is_some() {
            return ia_err!(
                "error reading config file '{}': '{}' and '{}' must be given together",
                file_path,
                USERNAME,
                PASSWORD
            );
        }
        Ok(profile)
    }
}
