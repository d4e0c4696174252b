//! Interviewer - Mock Technical Interview Backend
//!
//! This crate implements the conversation orchestration engine behind a mock
//! technical interview: it tracks the topic/question/message hierarchy of an
//! interview and asks a remote completion API for the next interviewer question.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
