//! # Event Route Resolution
//!
//! Turns the explicit `events` links of every block, plus the implicit
//! default-event wiring, into `EventRoute`s.
//!
//! A link is only routed if:
//! - its target tag resolves to a block of the same policy,
//! - the source descriptor declares the output type,
//! - the target descriptor declares the input type.
//!
//! Links failing a check are returned as `LinkProblem`s for the validation
//! pipeline to report. Disabled links are ignored.
//!
//! A route whose target can reach its source again, a self-link included,
//! closes an event cycle. Such routes are reported on their source block and
//! dropped, so the routes handed to the dispatcher always form a DAG.

use crate::domain::tree::{BlockInstance, BlockTree};
use shared_types::{BlockId, EventRoute, EventType};
use std::collections::{HashSet, VecDeque};

/// A link that could not be routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkProblem {
    pub block: BlockId,
    pub message: String,
}

/// All routes of a policy plus the links that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteResolution {
    /// Routes in declaration order: blocks in pre-order, then each block's
    /// explicit links, then its default route.
    pub routes: Vec<EventRoute>,
    pub problems: Vec<LinkProblem>,
}

impl RouteResolution {
    pub fn problems_for<'a>(&'a self, block: &'a BlockId) -> impl Iterator<Item = &'a str> + 'a {
        self.problems
            .iter()
            .filter(move |p| &p.block == block)
            .map(|p| p.message.as_str())
    }
}

impl BlockTree {
    /// Resolve every event route of the policy.
    pub fn resolve_routes(&self) -> RouteResolution {
        let mut resolution = RouteResolution::default();
        for instance in self.iter() {
            self.resolve_links(instance, &mut resolution);
            if let Some(route) = self.default_route(instance) {
                resolution.routes.push(route);
            }
        }
        self.cut_cycles(&mut resolution);
        resolution
    }

    /// Move every route lying on an event cycle into `problems`.
    fn cut_cycles(&self, resolution: &mut RouteResolution) {
        let on_cycle: Vec<bool> = resolution
            .routes
            .iter()
            .map(|route| reaches(&resolution.routes, &route.target, &route.source))
            .collect();
        if !on_cycle.contains(&true) {
            return;
        }

        let routes = std::mem::take(&mut resolution.routes);
        for (route, cyclic) in routes.into_iter().zip(on_cycle) {
            if !cyclic {
                resolution.routes.push(route);
                continue;
            }
            let target = self
                .resolve(&route.target)
                .map_or(route.target.as_str(), |target| target.tag.as_str());
            resolution.problems.push(LinkProblem {
                block: route.source.clone(),
                message: format!("{} to \"{target}\" closes an event cycle", route.output),
            });
        }
    }

    fn resolve_links(&self, source: &BlockInstance, resolution: &mut RouteResolution) {
        for link in source.events.iter().filter(|link| !link.disabled) {
            let mut problem = |message: String| {
                resolution.problems.push(LinkProblem {
                    block: source.id.clone(),
                    message,
                })
            };

            let Ok(target) = self.resolve_tag(&link.target) else {
                problem(format!("event target \"{}\" does not exist", link.target));
                continue;
            };
            if !source.descriptor.emits(link.output) {
                problem(format!(
                    "{} does not emit {}",
                    source.block_type, link.output
                ));
                continue;
            }
            if !target.descriptor.accepts(link.input) {
                problem(format!(
                    "event target \"{}\" ({}) does not accept {}",
                    target.tag, target.block_type, link.input
                ));
                continue;
            }

            resolution.routes.push(EventRoute {
                source: source.id.clone(),
                output: link.output,
                target: target.id.clone(),
                input: link.input,
            });
        }
    }

    /// Implicit `RunEvent` hand-over to the next sibling.
    ///
    /// Applies when the block declares the default event, emits `RunEvent`,
    /// has no explicit enabled `RunEvent` link, and the next sibling accepts
    /// `RunEvent`.
    fn default_route(&self, source: &BlockInstance) -> Option<EventRoute> {
        if !source.descriptor.default_event || !source.descriptor.emits(EventType::RunEvent) {
            return None;
        }
        let overridden = source
            .events
            .iter()
            .any(|link| !link.disabled && link.output == EventType::RunEvent);
        if overridden {
            return None;
        }
        let next = self.next_sibling(source)?;
        next.descriptor
            .accepts(EventType::RunEvent)
            .then(|| EventRoute {
                source: source.id.clone(),
                output: EventType::RunEvent,
                target: next.id.clone(),
                input: EventType::RunEvent,
            })
    }
}

/// Whether `to` is reachable from `from` along `routes`.
fn reaches(routes: &[EventRoute], from: &BlockId, to: &BlockId) -> bool {
    let mut visited: HashSet<&BlockId> = HashSet::new();
    let mut queue = VecDeque::from([from]);
    while let Some(block) = queue.pop_front() {
        if block == to {
            return true;
        }
        if !visited.insert(block) {
            continue;
        }
        queue.extend(
            routes
                .iter()
                .filter(|route| &route.source == block)
                .map(|route| &route.target),
        );
    }
    false
}
