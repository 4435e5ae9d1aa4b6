//! Taskdeck — Kanban task board core with optimistic drag-and-drop sync.

pub mod board;
pub mod config;
pub mod service;
