// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Text printed by `bastion-server version`.
pub fn format_version_info() -> String {
	format!(
		"bastion-server version: {}\n\
         Platform:                {}-{}\n\
         Profile:                 {}",
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH,
		if cfg!(debug_assertions) { "debug" } else { "release" },
	)
}
