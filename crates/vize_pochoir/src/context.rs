//! The traversal state machine.
//!
//! [`PatchContext::advance`] drives a lock-step, depth-first walk of the
//! static and dynamic trees over an explicit stack of [`PatchFrame`]s. It
//! never recurses into children: classifying a container pushes a frame and
//! returns to the loop, and a frame whose children are exhausted is popped
//! and folded. When classification has to wait for prefetch hooks or async
//! factories, `advance` hands back a [`Suspension`]; the caller awaits its
//! future and feeds the result to [`PatchContext::resume`].

use futures::future::LocalBoxFuture;
use vize_maquette::{AsyncResolution, RenderEngine, TagContext, VNodeData, VNodeRef};
use vize_relief::{Ast, AstId};

use crate::annotations::Annotations;
use crate::classify::PendingComponent;
use crate::errors::OptimizeError;
use crate::frame::{ActiveInstances, FrameChildren, PatchFrame, PatchPair};
use crate::options::OptimizeOptions;
use crate::render_tree::{RenderTree, TreeBuilder};
use crate::synth::Synthesizer;

/// Result of driving the traversal
pub enum Step {
    /// Every frame has been folded.
    Done,
    /// The traversal is waiting on asynchronous work.
    Suspended(Suspension),
}

/// Asynchronous work the traversal is waiting on
pub struct Suspension {
    pub future: LocalBoxFuture<'static, Result<Resolved, OptimizeError>>,
    pub continuation: Continuation,
}

impl std::fmt::Debug for Suspension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suspension")
            .field("continuation", &self.continuation)
            .finish_non_exhaustive()
    }
}

/// Value a [`Suspension`] future produces
#[derive(Debug, Clone)]
pub enum Resolved {
    /// Prefetch hooks of both instances completed.
    Prefetched,
    /// Both async factories resolved.
    Async {
        static_side: AsyncResolution,
        dynamic_side: AsyncResolution,
    },
}

/// Where the traversal picks up once a suspension settles
#[derive(Debug)]
pub struct Continuation(pub(crate) Pending);

#[derive(Debug)]
pub(crate) enum Pending {
    Component(PendingComponent),
    Async {
        pair: PatchPair,
        static_data: VNodeData,
        dynamic_data: VNodeData,
    },
}

/// What classifying one pair asks of the state machine
pub(crate) enum Outcome {
    Continue,
    Suspend(Suspension),
}

/// State of one optimization run
pub struct PatchContext<'e, E: RenderEngine + ?Sized> {
    pub(crate) engine: &'e E,
    pub(crate) options: OptimizeOptions,
    /// Program AST holding every grafted render function.
    pub(crate) ast: Ast,
    pub(crate) annotations: Annotations,
    pub(crate) frames: Vec<PatchFrame>,
    pub(crate) active: ActiveInstances,
    pub(crate) tree: TreeBuilder,
    pub(crate) synth: Synthesizer,
    root_slot: AstId,
    parked: Option<Suspension>,
    suspended: bool,
}

impl<'e, E: RenderEngine + ?Sized> PatchContext<'e, E> {
    pub fn new(
        engine: &'e E,
        static_root: VNodeRef,
        dynamic_root: VNodeRef,
        options: OptimizeOptions,
    ) -> Self {
        let mut ast = Ast::new();
        let root_slot = ast.placeholder();
        let root = PatchPair {
            static_node: static_root,
            dynamic_node: dynamic_root,
            slot: root_slot,
            static_ctx: TagContext::default(),
            dynamic_ctx: TagContext::default(),
        };
        Self {
            engine,
            synth: Synthesizer::new(options.validate),
            options,
            ast,
            annotations: Annotations::new(),
            frames: vec![PatchFrame::Fragment {
                slot: root_slot,
                children: FrameChildren::new(vec![root]),
            }],
            active: ActiveInstances::default(),
            tree: TreeBuilder::default(),
            root_slot,
            parked: None,
            suspended: false,
        }
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Slot standing for the root pair.
    pub fn root_slot(&self) -> AstId {
        self.root_slot
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn push_frame(&mut self, frame: PatchFrame) {
        tracing::trace!(kind = frame.kind_name(), depth = self.frames.len(), "push frame");
        self.frames.push(frame);
    }

    /// Run the traversal until it finishes or has to wait.
    pub fn advance(&mut self) -> Result<Step, OptimizeError> {
        if let Some(suspension) = self.parked.take() {
            self.suspended = true;
            return Ok(Step::Suspended(suspension));
        }
        if self.suspended {
            return Err(OptimizeError::NotResumed);
        }
        loop {
            let next = match self.frames.last_mut() {
                Some(frame) => frame.children_mut().next_pair(),
                None => return Ok(Step::Done),
            };
            match next {
                Some(pair) => {
                    if let Outcome::Suspend(suspension) = self.classify(pair)? {
                        self.suspended = true;
                        return Ok(Step::Suspended(suspension));
                    }
                }
                None => {
                    if let Some(frame) = self.frames.pop() {
                        tracing::trace!(kind = frame.kind_name(), depth = self.frames.len(), "pop frame");
                        self.finish_frame(frame)?;
                    }
                }
            }
        }
    }

    /// Continue the traversal with the value of the outstanding suspension.
    pub fn resume(
        &mut self,
        continuation: Continuation,
        resolved: Resolved,
    ) -> Result<(), OptimizeError> {
        if !self.suspended {
            return Err(OptimizeError::ResumeMismatch);
        }
        self.suspended = false;
        let outcome = match (continuation.0, resolved) {
            (Pending::Component(pending), Resolved::Prefetched) => self.render_component(pending)?,
            (
                Pending::Async {
                    pair,
                    static_data,
                    dynamic_data,
                },
                Resolved::Async {
                    static_side,
                    dynamic_side,
                },
            ) => self.classify_resolved(pair, static_data, dynamic_data, static_side, dynamic_side)?,
            _ => return Err(OptimizeError::ResumeMismatch),
        };
        if let Outcome::Suspend(suspension) = outcome {
            self.parked = Some(suspension);
        }
        Ok(())
    }

    /// The finished render tree.
    pub fn into_tree(self) -> Result<RenderTree, OptimizeError> {
        if self.suspended || self.parked.is_some() || !self.frames.is_empty() {
            return Err(OptimizeError::Incomplete);
        }
        self.tree.finish().ok_or(OptimizeError::RootNotComponent)
    }

    /// Drive the traversal to completion, awaiting every suspension.
    pub async fn run(mut self) -> Result<RenderTree, OptimizeError> {
        loop {
            match self.advance()? {
                Step::Done => return self.into_tree(),
                Step::Suspended(Suspension {
                    future,
                    continuation,
                }) => {
                    let resolved = future.await?;
                    self.resume(continuation, resolved)?;
                }
            }
        }
    }

    /// Drive the traversal and report its result to `done` exactly once.
    pub async fn run_with<F>(self, done: F)
    where
        F: FnOnce(Result<RenderTree, OptimizeError>),
    {
        done(self.run().await);
    }
}
