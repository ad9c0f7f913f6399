//! Request workflow state machine.
//!
//! Every operation validates against the current request, builds an
//! updated copy and returns it in a `Transition`. Nothing is mutated when
//! an operation fails.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::error::WorkflowError;
use super::request::{DownstreamLink, LinkKind, RequestEdit, SpendRequest};
use super::types::{
    Actor, ApprovalIntent, AuditKind, AuditRecord, Notice, RequestStatus, Transition,
    TransitionContext, TransitionKind,
};
use crate::ledger::DocRef;
use crate::routing::{
    ApprovalRoute, ApprovalRouteResolver, LevelApprover, RouteResolution, RoutingError,
};
use crate::settings::SettingsProvider;

/// Drives spend requests through their lifecycle.
#[derive(Clone)]
pub struct RequestWorkflow {
    resolver: ApprovalRouteResolver,
    settings: Arc<dyn SettingsProvider>,
}

impl RequestWorkflow {
    /// Creates a workflow backed by a settings provider.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            resolver: ApprovalRouteResolver::new(settings.clone()),
            settings,
        }
    }

    /// Submits a draft request.
    ///
    /// Goes to PendingReview at the first configured level, or straight to
    /// Approved with an informational notice when the route is empty.
    pub fn submit(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, WorkflowError> {
        Self::expect_status(request, &[RequestStatus::Draft], TransitionKind::Submit)?;
        if actor.id != request.owner {
            return Err(WorkflowError::NotCreator {
                actor: actor.id.clone(),
                owner: request.owner.clone(),
            });
        }

        let mut next = request.clone();
        next.refresh_totals(false)?;
        if next.amount <= Decimal::ZERO {
            return Err(WorkflowError::EmptyRequest);
        }

        let mut notices = Vec::new();
        let resolution = self.resolve_route(&mut next, actor, &mut notices)?;
        Self::enter_route(&mut next, &resolution, actor, &mut notices);

        info!(
            request = %next.reference.name,
            actor = %actor.id,
            status = %next.status,
            level = next.current_level,
            reason = ctx.reason.as_deref().unwrap_or(""),
            "Request submitted"
        );

        Ok(Self::transition(TransitionKind::Submit, request, next, notices))
    }

    /// Approves the current level.
    ///
    /// `ApprovalIntent::Final` fails if a later level is still configured.
    pub fn approve(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        intent: ApprovalIntent,
        ctx: &TransitionContext,
    ) -> Result<Transition, WorkflowError> {
        Self::expect_status(request, &[RequestStatus::PendingReview], TransitionKind::Approve)?;
        let route = self.ensure_fresh(request)?;
        let level = request.current_level;
        Self::authorize_level(route.level(level), actor, level)?;

        let next_level = route.next_level_after(level);
        if let (ApprovalIntent::Final, Some(pending)) = (intent, next_level) {
            return Err(WorkflowError::SkipLevel { level, pending });
        }

        let mut next = request.clone();
        if let Some(slot) = level
            .checked_sub(1)
            .and_then(|idx| next.level_users.get_mut(usize::from(idx)))
        {
            *slot = Some(actor.id.clone());
        }

        match next_level {
            Some(next_level) => {
                next.current_level = next_level;
                debug!(
                    request = %next.reference.name,
                    from_level = level,
                    to_level = next_level,
                    "Approval advanced"
                );
            }
            None => {
                next.status = RequestStatus::Approved;
                next.current_level = 0;
                next.approved_at = Some(Utc::now());
                info!(
                    request = %next.reference.name,
                    actor = %actor.id,
                    level,
                    reason = ctx.reason.as_deref().unwrap_or(""),
                    "Request approved"
                );
            }
        }

        Ok(Self::transition(TransitionKind::Approve, request, next, Vec::new()))
    }

    /// Rejects the request at the current level.
    pub fn reject(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, WorkflowError> {
        Self::expect_status(request, &[RequestStatus::PendingReview], TransitionKind::Reject)?;
        let route = self.ensure_fresh(request)?;
        let level = request.current_level;
        Self::authorize_level(route.level(level), actor, level)?;

        let mut next = request.clone();
        next.status = RequestStatus::Rejected;
        next.current_level = 0;
        next.rejected_at = Some(Utc::now());

        info!(
            request = %next.reference.name,
            actor = %actor.id,
            level,
            reason = ctx.reason.as_deref().unwrap_or(""),
            "Request rejected"
        );

        Ok(Self::transition(TransitionKind::Reject, request, next, Vec::new()))
    }

    /// Reopens a decided request and re-resolves its route.
    ///
    /// Active downstream documents block the reopen unless the context
    /// carries an override, which is recorded in the audit trail.
    pub fn reopen(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, WorkflowError> {
        if !request.status.is_reopenable() {
            return Err(WorkflowError::InvalidTransition {
                from: request.status,
                action: TransitionKind::Reopen,
            });
        }
        let control = self.settings.control_settings();
        if !actor.has_any_role(&control.reopen_roles) {
            return Err(WorkflowError::MissingRole {
                actor: actor.id.clone(),
                action: TransitionKind::Reopen,
            });
        }

        let active = Self::active_link_names(request);
        let mut notices = Vec::new();
        let mut next = request.clone();

        if !active.is_empty() {
            if !ctx.override_downstream {
                return Err(WorkflowError::DownstreamActive { links: active });
            }
            let authorized_by = ctx.authorized_by.as_deref().unwrap_or(&actor.id);
            warn!(
                request = %request.reference.name,
                authorized_by,
                links = %active.join(", "),
                "Reopen overriding active downstream documents"
            );
            notices.push(Notice::warning(format!(
                "Reopened with active downstream documents: {}",
                active.join(", ")
            )));
            next.audit.push(
                AuditRecord::new(
                    AuditKind::ReopenOverride,
                    Some(authorized_by),
                    ctx.reason
                        .clone()
                        .unwrap_or_else(|| "Downstream override".to_string()),
                )
                .with_details(active),
            );
        }

        next.downstream_links.clear();
        next.level_users = [None, None, None];
        next.approved_at = None;
        next.rejected_at = None;
        next.audit.push(AuditRecord::new(
            AuditKind::Reopened,
            Some(&actor.id),
            format!("Reopened from {}", request.status),
        ));

        let resolution = self.resolve_route(&mut next, actor, &mut notices)?;
        Self::enter_route(&mut next, &resolution, actor, &mut notices);

        info!(
            request = %next.reference.name,
            actor = %actor.id,
            status = %next.status,
            "Request reopened"
        );

        Ok(Self::transition(TransitionKind::Reopen, request, next, notices))
    }

    /// Cancels a request that has not been completed.
    pub fn cancel(
        &self,
        request: &SpendRequest,
        actor: &Actor,
        ctx: &TransitionContext,
    ) -> Result<Transition, WorkflowError> {
        if !request.status.is_cancellable() {
            return Err(WorkflowError::InvalidTransition {
                from: request.status,
                action: TransitionKind::Cancel,
            });
        }
        let control = self.settings.control_settings();
        if actor.id != request.owner && !actor.has_any_role(&control.reopen_roles) {
            return Err(WorkflowError::MissingRole {
                actor: actor.id.clone(),
                action: TransitionKind::Cancel,
            });
        }
        let active = Self::active_link_names(request);
        if !active.is_empty() {
            return Err(WorkflowError::DownstreamActive { links: active });
        }

        let mut next = request.clone();
        next.status = RequestStatus::Cancelled;
        next.current_level = 0;
        next.audit.push(AuditRecord::new(
            AuditKind::Cancelled,
            Some(&actor.id),
            ctx.reason.clone().unwrap_or_else(|| "Cancelled".to_string()),
        ));

        info!(request = %next.reference.name, actor = %actor.id, "Request cancelled");
        Ok(Self::transition(TransitionKind::Cancel, request, next, Vec::new()))
    }

    /// Applies an edit to a saved request.
    ///
    /// A key-field change while pending review re-resolves the route and
    /// restarts approval at the first configured level. Key-field changes
    /// on approved or completed requests are refused.
    pub fn apply_edit(
        &self,
        request: &SpendRequest,
        edit: &RequestEdit,
        actor: &Actor,
    ) -> Result<Transition, WorkflowError> {
        let mut next = edit.apply_to(request)?;
        let mut notices = Vec::new();

        if !request.key_fields_differ(&next) {
            return Ok(Self::transition(TransitionKind::Edit, request, next, notices));
        }
        if request.status.is_financially_final() {
            return Err(WorkflowError::KeyFieldsLocked {
                status: request.status,
            });
        }

        if request.status == RequestStatus::PendingReview {
            if next.amount <= Decimal::ZERO {
                return Err(WorkflowError::EmptyRequest);
            }
            next.level_users = [None, None, None];
            let resolution = self.resolve_route(&mut next, actor, &mut notices)?;
            Self::enter_route(&mut next, &resolution, actor, &mut notices);
            info!(
                request = %next.reference.name,
                status = %next.status,
                level = next.current_level,
                "Key fields changed; route recomputed"
            );
        }

        Ok(Self::transition(TransitionKind::Edit, request, next, notices))
    }

    /// Records a downstream document against an approved request.
    ///
    /// Linking a document that is already active is a no-op.
    pub fn link(
        &self,
        request: &SpendRequest,
        link: DownstreamLink,
    ) -> Result<Transition, WorkflowError> {
        Self::expect_status(
            request,
            &[RequestStatus::Approved, RequestStatus::Linked, RequestStatus::Paid],
            TransitionKind::Link,
        )?;

        let mut next = request.clone();
        let already_active = next
            .downstream_links
            .iter()
            .any(|existing| existing.is_active() && existing.reference == link.reference);
        if already_active {
            return Ok(Self::transition(TransitionKind::Link, request, next, Vec::new()));
        }

        next.status = match (link.kind, next.status) {
            (LinkKind::Payment, _) | (_, RequestStatus::Paid) => RequestStatus::Paid,
            _ => RequestStatus::Linked,
        };
        debug!(request = %next.reference.name, link = %link.reference, "Downstream document linked");
        next.downstream_links.push(link);

        Ok(Self::transition(TransitionKind::Link, request, next, Vec::new()))
    }

    /// Marks a downstream document as cancelled.
    ///
    /// When no active link remains the request returns to Approved.
    pub fn cancel_link(
        &self,
        request: &SpendRequest,
        reference: &DocRef,
    ) -> Result<Transition, WorkflowError> {
        let mut next = request.clone();
        let link = next
            .downstream_links
            .iter_mut()
            .find(|link| link.is_active() && &link.reference == reference)
            .ok_or_else(|| WorkflowError::LinkNotFound(reference.to_string()))?;
        link.cancelled = true;

        if next.active_links().is_empty()
            && matches!(next.status, RequestStatus::Linked | RequestStatus::Paid)
        {
            next.status = RequestStatus::Approved;
        } else if next.status == RequestStatus::Paid
            && !next
                .active_links()
                .iter()
                .any(|link| link.kind == LinkKind::Payment)
        {
            next.status = RequestStatus::Linked;
        }

        debug!(request = %next.reference.name, link = %reference, "Downstream link cancelled");
        Ok(Self::transition(TransitionKind::CancelLink, request, next, Vec::new()))
    }

    /// Closes a request once downstream processing is done.
    pub fn close(&self, request: &SpendRequest, actor: &Actor) -> Result<Transition, WorkflowError> {
        Self::expect_status(
            request,
            &[RequestStatus::Approved, RequestStatus::Linked, RequestStatus::Paid],
            TransitionKind::Close,
        )?;
        let control = self.settings.control_settings();
        if actor.id != request.owner && !actor.has_any_role(&control.reopen_roles) {
            return Err(WorkflowError::MissingRole {
                actor: actor.id.clone(),
                action: TransitionKind::Close,
            });
        }

        let mut next = request.clone();
        next.status = RequestStatus::Closed;
        info!(request = %next.reference.name, actor = %actor.id, "Request closed");
        Ok(Self::transition(TransitionKind::Close, request, next, Vec::new()))
    }

    /// Resolves the route for the request's current key fields.
    ///
    /// An inconsistent route fails the operation; any other failure is
    /// logged, audited and treated as missing configuration.
    fn resolve_route(
        &self,
        request: &mut SpendRequest,
        actor: &Actor,
        notices: &mut Vec<Notice>,
    ) -> Result<RouteResolution, WorkflowError> {
        match self
            .resolver
            .resolve(&request.cost_center, &request.expense_accounts, request.amount)
        {
            Ok(resolution) => Ok(resolution),
            Err(err @ RoutingError::RouteInconsistent { .. }) => Err(err.into()),
            Err(err) => {
                warn!(
                    request = %request.reference.name,
                    cost_center = %request.cost_center,
                    error = %err,
                    "Route resolution failed; treating as no route"
                );
                request.audit.push(AuditRecord::new(
                    AuditKind::RouteDegraded,
                    Some(&actor.id),
                    format!("Route resolution failed: {err}"),
                ));
                notices.push(Notice::warning("Approval route could not be resolved"));
                Ok(RouteResolution::ConfigMissing {
                    cost_center: request.cost_center.clone(),
                })
            }
        }
    }

    /// Binds a resolved route and enters its first level, or auto-approves.
    fn enter_route(
        request: &mut SpendRequest,
        resolution: &RouteResolution,
        actor: &Actor,
        notices: &mut Vec<Notice>,
    ) {
        let now = Utc::now();
        request.route_snapshot = resolution.snapshot(now);

        match resolution.route().first_level() {
            Some(level) => {
                request.status = RequestStatus::PendingReview;
                request.current_level = level;
            }
            None => {
                let message = match resolution {
                    RouteResolution::ConfigMissing { cost_center } => format!(
                        "Auto-approved: no approval setting is configured for cost center {cost_center}"
                    ),
                    RouteResolution::Route { setting, .. } => format!(
                        "Auto-approved: approval setting {} has no route for this request",
                        setting.name
                    ),
                };
                info!(request = %request.reference.name, "{message}");
                request.status = RequestStatus::Approved;
                request.current_level = 0;
                request.approved_at = Some(now);
                request.audit.push(AuditRecord::new(
                    AuditKind::AutoApproved,
                    Some(&actor.id),
                    message.clone(),
                ));
                notices.push(Notice::info(message));
            }
        }
    }

    /// Returns the snapshot route if it is still current.
    fn ensure_fresh(
        &self,
        request: &SpendRequest,
    ) -> Result<ApprovalRoute, WorkflowError> {
        let stale = || WorkflowError::RouteStale {
            reference: request.reference.name.clone(),
        };
        let snapshot = request.route_snapshot.as_ref().ok_or_else(stale)?;
        let current = self
            .settings
            .active_approval_setting(&request.cost_center)?
            .ok_or_else(stale)?;
        if snapshot.is_stale_against(&current) {
            debug!(
                request = %request.reference.name,
                setting = %current.name,
                "Route snapshot is stale"
            );
            return Err(stale());
        }
        Ok(snapshot.route.clone())
    }

    /// Checks the actor against the level's role and user constraints.
    fn authorize_level(
        approver: Option<&LevelApprover>,
        actor: &Actor,
        level: u8,
    ) -> Result<(), WorkflowError> {
        let denied = || WorkflowError::NotRoutedApprover {
            actor: actor.id.clone(),
            level,
        };
        let approver = approver.filter(|a| a.is_configured()).ok_or_else(denied)?;
        let role_ok = approver.role.as_deref().is_none_or(|role| actor.has_role(role));
        let user_ok = approver.user.as_deref().is_none_or(|user| actor.id == user);
        if role_ok && user_ok {
            Ok(())
        } else {
            Err(denied())
        }
    }

    fn expect_status(
        request: &SpendRequest,
        allowed: &[RequestStatus],
        action: TransitionKind,
    ) -> Result<(), WorkflowError> {
        if allowed.contains(&request.status) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition {
                from: request.status,
                action,
            })
        }
    }

    fn active_link_names(request: &SpendRequest) -> Vec<String> {
        request
            .active_links()
            .iter()
            .map(|link| link.reference.to_string())
            .collect()
    }

    fn transition(
        kind: TransitionKind,
        before: &SpendRequest,
        after: SpendRequest,
        notices: Vec<Notice>,
    ) -> Transition {
        Transition {
            kind,
            from: before.status,
            to: after.status,
            request: after,
            notices,
        }
    }
}
