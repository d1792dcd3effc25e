//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::error::{ia_err, DaoError};
use std::path::PathBuf;

/// Expands a leading `~/` to the current user's home directory.
///
/// Paths without a leading `~` are returned unchanged.
pub(crate) fn expand_user_home(file_path: &str) -> Result<String, DaoError> {
    if file_path.starts_with("~/") || file_path.starts_with("~\\") {
        match dirs::home_dir() {
            Some(home_dir) => {
                let full_path = home_dir.join(PathBuf::from(correct_path(&file_path[2..])));
                Ok(format!("{}", full_path.display()))
            }
            None => ia_err!("cannot expand '{}': no home directory", file_path),
        }
    } else {
        Ok(String::from(file_path))
    }
}

fn correct_path(file_path: &str) -> String {
    if cfg!(target_os = "windows") {
        file_path.replace('/', "\\")
    } else {
        String::from(file_path)
    }
}
