//! FIFO work queue with set semantics

use std::collections::{HashSet, VecDeque};

/// Ordered set of file names waiting for work
///
/// A name is queued at most once; pushing it again keeps its position.
/// Work is taken from the front, and a failed item is rotated to the back
/// so one stuck file cannot starve the others.
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
	order: VecDeque<String>,
	members: HashSet<String>,
}

impl WorkQueue {
	pub fn new() -> Self {
		Self::default()
	}

	/// Enqueue `name`; returns false if it was already queued
	pub fn push(&mut self, name: impl Into<String>) -> bool {
		let name = name.into();
		if self.members.contains(&name) {
			return false;
		}
		self.members.insert(name.clone());
		self.order.push_back(name);
		true
	}

	pub fn front(&self) -> Option<&str> {
		self.order.front().map(String::as_str)
	}

	/// Drop `name` wherever it is; returns whether it was queued
	pub fn remove(&mut self, name: &str) -> bool {
		if !self.members.remove(name) {
			return false;
		}
		self.order.retain(|n| n != name);
		true
	}

	/// Move `name` to the back; returns whether it was queued
	pub fn requeue(&mut self, name: &str) -> bool {
		if !self.members.contains(name) {
			return false;
		}
		if let Some(pos) = self.order.iter().position(|n| n == name) {
			if let Some(item) = self.order.remove(pos) {
				self.order.push_back(item);
			}
		}
		true
	}

	/// Keep only names for which `keep` returns true; returns how many were dropped
	pub fn retain<F>(&mut self, mut keep: F) -> usize
	where
		F: FnMut(&str) -> bool,
	{
		let before = self.order.len();
		let members = &mut self.members;
		self.order.retain(|n| {
			let kept = keep(n.as_str());
			if !kept {
				members.remove(n);
			}
			kept
		});
		before - self.order.len()
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	pub fn clear(&mut self) {
		self.order.clear();
		self.members.clear();
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.order.iter().map(String::as_str)
	}
}


// vim: ts=4
