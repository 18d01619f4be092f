// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

mod basic;
mod dry_run;
mod errors;
mod resume;
mod retry;
