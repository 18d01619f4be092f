// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The drover authors

mod consolidate;
mod help;
mod status;
