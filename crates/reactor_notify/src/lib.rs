//! # reactor_notify
//!
//! The publish/subscribe primitive every other layer is wired with.
//!
//! A [`NotifierGraph`] is an arena of notifier nodes. Nodes can be connected
//! to other nodes; notifying a node invokes its local callback (if any) and
//! propagates to every node reachable through outgoing edges.
//!
//! - [`NotifierGraph`] — the arena and its traversal operations.
//! - [`NodeId`] — a generational handle to one node.

pub mod graph;

pub use graph::{NodeId, NotifierGraph};
