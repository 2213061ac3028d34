//! Price-stabilizing submission loop.
//!
//! One session: read the account and reference prices once, evaluate the pool, and
//! if the divergence is wide enough keep submitting the planned order until the pool
//! converges or the iteration budget runs out.

use std::fmt::{self, Display};
use std::time::Duration;

use bigdecimal::BigDecimal;

use crate::client::{BroadcastResult, LedgerClient, PriceSource};
use crate::error::{Error, Result};
use crate::market::decimal::dec_with_prec;
use crate::market::{
    evaluate, plan, Evaluation, OrderIntent, Plan, ReferencePrice, ReservePair, StabilizeCaps,
};
use crate::tx::{AccountState, TxBuilder, TxSigner};

/// Pool the stabilizer works on, with the price ids of both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairTarget {
    /// Pool id orders are sent to
    pub pool_id: u64,
    /// X denom (numerator of the pool rate)
    pub denom_x: String,
    /// Y denom
    pub denom_y: String,
    /// Price-service id of X
    pub price_id_x: String,
    /// Price-service id of Y
    pub price_id_y: String,
}

/// Knobs of the stabilizing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilizerSettings {
    /// Planner thresholds and caps
    pub caps: StabilizeCaps,
    /// `|divergence|` at or below which the pool counts as converged
    pub convergence_tolerance: BigDecimal,
    /// Largest number of submissions per session
    pub max_iterations: u64,
    /// Pause after each submission
    pub pacing: Duration,
    /// Pause between sessions that found nothing to do
    pub idle_interval: Duration,
    /// Re-plan from every fresh evaluation instead of replaying the first order
    pub replan_each_iteration: bool,
}

impl Default for StabilizerSettings {
    fn default() -> Self {
        Self {
            caps: StabilizeCaps::default(),
            convergence_tolerance: dec_with_prec(1, 10),
            max_iterations: 100_000,
            pacing: Duration::from_secs(1),
            idle_interval: Duration::from_secs(10),
            replan_each_iteration: false,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The divergence was inside the threshold band; nothing submitted
    NoAction {
        /// Divergence observed
        divergence: BigDecimal,
    },
    /// The pool reached the reference rate
    Converged {
        /// Evaluations performed after the triggering one
        iterations: u64,
        /// Transactions broadcast
        submitted: u64,
    },
    /// The budget ran out before the pool converged
    IterationBudgetExhausted {
        /// Transactions broadcast
        submitted: u64,
    },
}

impl Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAction { divergence } => write!(f, "no action (divergence {divergence})"),
            Self::Converged {
                iterations,
                submitted,
            } => write!(
                f,
                "converged after {iterations} iterations, {submitted} transactions"
            ),
            Self::IterationBudgetExhausted { submitted } => {
                write!(f, "iteration budget exhausted after {submitted} transactions")
            }
        }
    }
}

/// Everything a running session carries between states.
#[derive(Debug)]
struct Session {
    account: AccountState,
    prices: (ReferencePrice, ReferencePrice),
    intent: OrderIntent,
    iteration: u64,
    submitted: u64,
}

#[derive(Debug)]
enum State {
    Idle,
    Evaluating(Session),
    Submitting(Session),
    AwaitingResult(Session, BroadcastResult),
    Terminal(SessionOutcome),
}

/// Drives one pool toward its reference rate.
pub struct Stabilizer<'a> {
    ledger: &'a dyn LedgerClient,
    prices: &'a dyn PriceSource,
    signer: &'a dyn TxSigner,
    builder: TxBuilder,
    target: PairTarget,
    settings: StabilizerSettings,
}

impl<'a> Stabilizer<'a> {
    /// Wires a stabilizer to its collaborators.
    pub fn new(
        ledger: &'a dyn LedgerClient,
        prices: &'a dyn PriceSource,
        signer: &'a dyn TxSigner,
        builder: TxBuilder,
        target: PairTarget,
        settings: StabilizerSettings,
    ) -> Self {
        Self {
            ledger,
            prices,
            signer,
            builder,
            target,
            settings,
        }
    }

    /// Runs sessions back to back until one converges or exhausts its budget.
    ///
    /// # Errors
    /// The first collaborator, planning or signing error.
    pub async fn run(&self) -> Result<SessionOutcome> {
        loop {
            let outcome = self.run_session().await?;
            if !matches!(outcome, SessionOutcome::NoAction { .. }) {
                return Ok(outcome);
            }
            log::info!(
                "stabilizer: {outcome}; next check in {:?}",
                self.settings.idle_interval
            );
            tokio::time::sleep(self.settings.idle_interval).await;
        }
    }

    /// Runs a single session to its terminal state.
    ///
    /// # Errors
    /// Any collaborator error aborts the session. A broadcast the chain rejects with a
    /// non-zero code is a `Network` error.
    pub async fn run_session(&self) -> Result<SessionOutcome> {
        let mut state = State::Idle;
        loop {
            state = match state {
                State::Idle => self.start().await?,
                State::Evaluating(session) => self.reevaluate(session).await?,
                State::Submitting(session) => self.submit(session).await?,
                State::AwaitingResult(session, result) => self.settle(session, result).await?,
                State::Terminal(outcome) => return Ok(outcome),
            };
        }
    }

    /// Reserves of the pair's pool, which must be the pool orders are sent to.
    async fn fetch_reserves(&self) -> Result<ReservePair> {
        let (pool, reserves) = self
            .ledger
            .pool_reserves(&self.target.denom_x, &self.target.denom_y)
            .await?;
        if pool.id != self.target.pool_id {
            return Err(Error::Config(format!(
                "{}/{} trades in pool {}, not the configured pool {}",
                self.target.denom_x, self.target.denom_y, pool.id, self.target.pool_id
            )));
        }
        Ok(reserves)
    }

    async fn fetch_prices(&self) -> Result<(ReferencePrice, ReferencePrice)> {
        let ids = [self.target.price_id_x.clone(), self.target.price_id_y.clone()];
        let mut quotes = self.prices.prices(&ids).await?;
        let mut take = |id: &str, denom: &str| {
            quotes
                .remove(id)
                .map(|usd| ReferencePrice::new(denom, usd))
                .ok_or_else(|| Error::MissingReferencePrice(format!("{denom} (id {id})")))
        };
        let price_x = take(&self.target.price_id_x, &self.target.denom_x)?;
        let price_y = take(&self.target.price_id_y, &self.target.denom_y)?;
        Ok((price_x, price_y))
    }

    async fn start(&self) -> Result<State> {
        let account = self.ledger.account(self.signer.address()).await?;
        let prices = self.fetch_prices().await?;
        let reserves = self.fetch_reserves().await?;
        let evaluation = evaluate(&reserves, (&prices.0, &prices.1))?;
        log_context(0, &reserves, &prices, &evaluation);

        if evaluation.is_converged(&self.settings.convergence_tolerance) {
            log::info!("stabilizer: pool {} already at reference rate", self.target.pool_id);
            return Ok(State::Terminal(SessionOutcome::Converged {
                iterations: 0,
                submitted: 0,
            }));
        }

        match plan(&evaluation, &reserves, &self.settings.caps, self.target.pool_id)? {
            Plan::NoAction => Ok(State::Terminal(SessionOutcome::NoAction {
                divergence: evaluation.divergence,
            })),
            Plan::Order(intent) => {
                log::info!(
                    "stabilizer: divergence {} crosses threshold {}; planned {intent}",
                    evaluation.divergence,
                    self.settings.caps.upper_threshold
                );
                Ok(State::Evaluating(Session {
                    account,
                    prices,
                    intent,
                    iteration: 0,
                    submitted: 0,
                }))
            }
        }
    }

    async fn reevaluate(&self, mut session: Session) -> Result<State> {
        if session.iteration >= self.settings.max_iterations {
            log::warn!(
                "stabilizer: {} iterations used without converging",
                session.iteration
            );
            return Ok(State::Terminal(SessionOutcome::IterationBudgetExhausted {
                submitted: session.submitted,
            }));
        }
        session.iteration += 1;

        let reserves = self.fetch_reserves().await?;
        let (price_x, price_y) = &session.prices;
        let evaluation = evaluate(&reserves, (price_x, price_y))?;
        log_context(session.iteration, &reserves, &session.prices, &evaluation);

        if evaluation.is_converged(&self.settings.convergence_tolerance) {
            log::info!(
                "stabilizer: pool {} converged, divergence {}",
                self.target.pool_id,
                evaluation.divergence
            );
            return Ok(State::Terminal(SessionOutcome::Converged {
                iterations: session.iteration,
                submitted: session.submitted,
            }));
        }

        if self.settings.replan_each_iteration {
            match plan(&evaluation, &reserves, &self.settings.caps, self.target.pool_id)? {
                Plan::Order(intent) => session.intent = intent,
                Plan::NoAction => {
                    log::debug!("stabilizer: fresh plan is empty, keeping {}", session.intent);
                }
            }
        }
        Ok(State::Submitting(session))
    }

    async fn submit(&self, session: Session) -> Result<State> {
        let tx = self.builder.sign(
            &session.account,
            self.signer,
            std::slice::from_ref(&session.intent),
        )?;
        log::info!(
            "stabilizer: [{}] sending {} with sequence {}",
            session.iteration,
            session.intent,
            tx.sequence
        );
        let result = self.ledger.broadcast(&tx).await?;
        Ok(State::AwaitingResult(session, result))
    }

    async fn settle(&self, mut session: Session, result: BroadcastResult) -> Result<State> {
        if !result.is_ok() {
            return Err(Error::Network(format!(
                "transaction {} rejected with code {}: {}",
                result.tx_hash, result.code, result.raw_log
            )));
        }
        log::info!(
            "stabilizer: tx {} at height {}",
            result.tx_hash,
            result.height
        );
        session.account.advance();
        session.submitted += 1;

        tokio::time::sleep(self.settings.pacing).await;
        Ok(State::Evaluating(session))
    }
}

fn log_context(
    iteration: u64,
    reserves: &ReservePair,
    prices: &(ReferencePrice, ReferencePrice),
    evaluation: &Evaluation,
) {
    log::info!(
        "stabilizer: [{iteration}] reserves {reserves} | usd {}={} {}={} \
         | pool rate {} | reference rate {} | divergence {}",
        prices.0.denom,
        prices.0.usd_price,
        prices.1.denom,
        prices.1.usd_price,
        evaluation.pool_rate,
        evaluation.reference_rate,
        evaluation.divergence
    );
}
