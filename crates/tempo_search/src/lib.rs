//! The arrival/required search core of the Tempo timing analyzer.
//!
//! Given a levelized timing graph (`tempo_graph`), constraint state
//! (`tempo_sdc`), and pre-computed per-arc delays, this crate computes
//! arrival times forward and required times backward over every path, then
//! enumerates the worst-slack path endpoints.
//!
//! One vertex carries many distinct paths at once (one per combination of
//! clock, transition, analysis corner, and exception state), named by
//! interned [`Tag`]s grouped into interned [`TagGroup`]s. The search walks
//! the graph level by level with parallel workers inside each level,
//! iterates transparent-latch feedback to a fixed point, prunes arrivals
//! dominated beyond any possible clock-reconvergence-pessimism credit, and
//! maintains arrivals, requireds, endpoint slack, TNS, and WNS
//! incrementally under edits.
//!
//! # Usage
//!
//! ```ignore
//! use tempo_search::{PathEndOptions, Search};
//!
//! let levelize = Levelize::new(&mut graph);
//! let mut search = Search::new(&graph, &network, &sdc, &levelize);
//! search.find_all_arrivals();
//! search.find_requireds(0);
//! let wns = search.worst_slack(MinMax::Max);
//! let ends = search.find_path_ends(None, vec![], None, &PathEndOptions::default(),
//!                                  &interner, &sink);
//! ```
//!
//! # Architecture
//!
//! - [`clk_info`], [`tag`], [`tag_group`], [`pool`] — interned path
//!   identities
//! - [`pred`] — edge/vertex admissibility
//! - [`bfs`] — level-ordered parallel worklists
//! - [`arrival`], [`mutate`] — forward propagation and tag mutation
//! - [`required`] — backward propagation
//! - [`latches`], [`genclks`], [`crpr`] — latch borrowing, generated
//!   clocks, pessimism removal
//! - [`path_end`], [`path_groups`], [`slack`] — endpoint checks,
//!   enumeration, aggregation
//! - [`search`] — the owning state object and pass drivers

#![warn(missing_docs)]

pub mod arrival;
pub mod bfs;
pub mod clk_info;
pub mod crpr;
pub mod genclks;
pub mod latches;
pub mod mutate;
pub mod path_end;
pub mod path_groups;
pub mod pool;
pub mod pred;
pub mod required;
pub mod search;
pub mod slack;
pub mod tag;
pub mod tag_group;

pub use bfs::{BfsDir, BfsIterator};
pub use clk_info::{ClkInfo, PathRep};
pub use genclks::Genclks;
pub use latches::LatchState;
pub use path_end::{PathEnd, PathEndKind};
pub use path_groups::PathEndOptions;
pub use pool::{ClkInfoId, Pools, TagGroupId, TagId};
pub use pred::SearchPred;
pub use search::Search;
pub use tag::Tag;
pub use tag_group::{TagGroup, TagGroupBldr};
