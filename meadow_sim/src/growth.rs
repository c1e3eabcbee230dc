// Generic growth-state engine.
//
// Every growth unit of every species runs the same four states through a
// `StateMachine<GrowthState, GrowthContext>`:
//
//   Seed ──swap──▶ Growing ──swap──▶ Mature
//     │               │                 │
//     └─────push──▶ Dormant ◀──push─────┘      (pop returns to the
//                                               interrupted state)
//
// What each state does is read from the species' `SpeciesData` when the
// machine is built (`build_machine`); states keep their own copies of the
// parameters they need.
//
// - Seed: daily germination trial (shadow-modulated). Once it succeeds the
//   next tick's swap fires; the seed's exit claims the unit's cell, and a
//   failed claim withers the unit. Otherwise a survival countdown withers it
//   when it reaches zero.
// - Growing: advances toward the species' `GrowthTarget` (days, scale or
//   absorptions), optionally tries to place offspring.
// - Mature: offspring trials, optional lifespan, offspring cap, and ongoing
//   absorption with a lifetime limit.
// - Dormant: pushed while the season matches the species' dormancy season,
//   popped when it changes. May wither.
//
// Life-stage transitions are registered before the dormancy push, so a unit
// that is ready to advance does so before going dormant.
//
// Death is recorded as a fate on the unit body (`UnitBody::wither`). Once a
// fate is set the remaining hooks of that tick do nothing, and the
// dispatcher never updates the unit again.

use meadow_prng::SimRng;

use crate::context::{AbsorbOutcome, GrowthContext, GrowthRequest, UnitBody};
use crate::event::{SimEventKind, WitherCause};
use crate::species::{
    AbsorptionParams, DormancyParams, GrowthTarget, OffspringParams, SeedParams, SpeciesData,
};
use crate::state_machine::{State, StateGraph, StateMachine, StateTransition, TransitionEffect};
use crate::visual::{VisualInstance, VisualKind};

/// Coarse life stage of a unit, for callers that don't care about state
/// internals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Seed,
    Growing,
    Mature,
    Dormant,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Countdown to the next absorption attempt, redrawn after each one.
#[derive(Clone, Copy, Debug)]
struct AbsorbTimer {
    min_days: u32,
    max_days: u32,
    days_left: u32,
}

impl AbsorbTimer {
    fn new(params: &AbsorptionParams, rng: &mut SimRng) -> Self {
        let days_left = rng.range_u32_inclusive(params.interval_min_days, params.interval_max_days);
        Self {
            min_days: params.interval_min_days,
            max_days: params.interval_max_days,
            days_left,
        }
    }

    /// Count down one day; true when an attempt is due.
    fn tick(&mut self, rng: &mut SimRng) -> bool {
        self.days_left = self.days_left.saturating_sub(1);
        if self.days_left > 0 {
            return false;
        }
        self.days_left = rng.range_u32_inclusive(self.min_days, self.max_days);
        true
    }
}

/// Shadow-modulated offspring trial. On success queues a placement request
/// `spread_distance` away in a random direction.
fn offspring_trial(params: &OffspringParams, ctx: &mut GrowthContext) -> bool {
    let chance = params.daily_chance * params.shadow_curve.modulate(ctx.unit.shadow);
    if !ctx.rng.chance(chance) {
        return false;
    }
    let angle = ctx.rng.angle();
    let lift = if params.vertical_jitter > 0.0 {
        params.vertical_jitter * ctx.rng.range_f32(-1.0, 1.0)
    } else {
        0.0
    };
    let d = params.spread_distance;
    let position = ctx
        .unit
        .position
        .offset(angle.cos() * d, lift, angle.sin() * d);
    ctx.requests.push(GrowthRequest::Offspring { position });
    true
}

fn create_leaf(ctx: &mut GrowthContext, random_yaw: bool, decay: f32) {
    let yaw = if random_yaw { ctx.rng.angle() } else { 0.0 };
    let mut leaf = VisualInstance::new(VisualKind::LeafModel, ctx.unit.position);
    leaf.scale = ctx.unit.scale;
    leaf.shade = ctx.unit.shadow;
    leaf.decay = decay;
    leaf.yaw = yaw;
    ctx.unit.visual = Some(ctx.visuals.create(leaf));
}

fn sync_leaf(ctx: &mut GrowthContext, decay: f32) {
    let scale = ctx.unit.scale;
    if let Some(leaf) = ctx.unit.visual.and_then(|h| ctx.visuals.get_mut(h)) {
        leaf.scale = scale;
        leaf.decay = decay;
    }
}

fn fraction(done: u32, total: u32) -> f32 {
    if total == 0 {
        1.0
    } else {
        (done as f32 / total as f32).min(1.0)
    }
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct SeedState {
    params: SeedParams,
    contest: bool,
    survival_days_left: u32,
    will_grow: bool,
}

impl SeedState {
    /// Survival is drawn from `average ± variation`, inclusive.
    pub fn new(params: SeedParams, contest: bool, rng: &mut SimRng) -> Self {
        let low = params
            .survival_days_average
            .saturating_sub(params.survival_days_variation);
        let high = params
            .survival_days_average
            .saturating_add(params.survival_days_variation);
        Self {
            params,
            contest,
            survival_days_left: rng.range_u32_inclusive(low, high),
            will_grow: false,
        }
    }

    pub fn will_grow(&self) -> bool {
        self.will_grow
    }

    pub fn survival_days_left(&self) -> u32 {
        self.survival_days_left
    }
}

impl State<GrowthContext> for SeedState {
    fn enter(&mut self, ctx: &mut GrowthContext) {
        if self.params.placeholder_visual {
            let placeholder = VisualInstance::new(VisualKind::SeedModel, ctx.unit.position);
            ctx.unit.visual = Some(ctx.visuals.create(placeholder));
        }
    }

    fn update(&mut self, ctx: &mut GrowthContext) {
        if ctx.unit.is_dead() || self.will_grow {
            return;
        }
        let chance =
            self.params.daily_growth_chance * self.params.shadow_curve.modulate(ctx.unit.shadow);
        if ctx.rng.chance(chance) {
            self.will_grow = true;
            return;
        }
        self.survival_days_left = self.survival_days_left.saturating_sub(1);
        if self.survival_days_left == 0 {
            ctx.unit.wither(WitherCause::SurvivalExpired);
        }
    }

    fn exit(&mut self, ctx: &mut GrowthContext) {
        ctx.destroy_unit_visual();
        if ctx.unit.is_dead() {
            return;
        }
        if let Err(cause) = ctx.claim_unit_cell(self.contest) {
            ctx.unit.wither(cause);
        }
    }
}

// ---------------------------------------------------------------------------
// Growing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct GrowingState {
    target: GrowthTarget,
    /// Per-unit scale threshold for `GrowthTarget::Scale`.
    threshold: f32,
    offspring: Option<OffspringParams>,
    absorb: Option<AbsorbTimer>,
    random_yaw: bool,
    elapsed_days: u32,
}

impl GrowingState {
    pub fn new(data: &SpeciesData, rng: &mut SimRng) -> Self {
        let threshold = match data.growth {
            GrowthTarget::Scale {
                min_target,
                max_target,
                ..
            } => rng.range_f32_or_low(min_target, max_target),
            _ => 0.0,
        };
        Self {
            target: data.growth,
            threshold,
            offspring: data.growing_offspring,
            absorb: data.absorption.map(|a| AbsorbTimer::new(&a, rng)),
            random_yaw: data.random_yaw,
            elapsed_days: 0,
        }
    }

    /// Days spent growing so far. Dormant days do not count.
    pub fn elapsed_days(&self) -> u32 {
        self.elapsed_days
    }

    pub fn reached_target(&self, unit: &UnitBody) -> bool {
        match self.target {
            GrowthTarget::Days { days, .. } => self.elapsed_days >= days,
            GrowthTarget::Scale { .. } => unit.scale > self.threshold,
            GrowthTarget::Absorptions { count } => unit.absorbed >= count,
        }
    }

    fn initial_scale(&self) -> f32 {
        match self.target {
            GrowthTarget::Days { initial_scale, .. }
            | GrowthTarget::Scale { initial_scale, .. } => initial_scale,
            GrowthTarget::Absorptions { .. } => 1.0,
        }
    }

    fn decay(&self, absorbed: u32) -> f32 {
        match self.target {
            GrowthTarget::Absorptions { count } => fraction(absorbed, count),
            _ => 0.0,
        }
    }
}

impl State<GrowthContext> for GrowingState {
    fn enter(&mut self, ctx: &mut GrowthContext) {
        if ctx.unit.is_dead() {
            return;
        }
        ctx.unit.scale = self.initial_scale();
        create_leaf(ctx, self.random_yaw, self.decay(ctx.unit.absorbed));
    }

    fn update(&mut self, ctx: &mut GrowthContext) {
        if ctx.unit.is_dead() {
            return;
        }
        self.elapsed_days += 1;
        match self.target {
            GrowthTarget::Days {
                days,
                initial_scale,
                final_scale,
            } => {
                let t = fraction(self.elapsed_days, days);
                ctx.unit.scale = initial_scale + (final_scale - initial_scale) * t;
            }
            GrowthTarget::Scale { daily_gain, .. } => ctx.unit.scale += daily_gain,
            GrowthTarget::Absorptions { .. } => {}
        }
        if let Some(timer) = &mut self.absorb {
            if timer.tick(&mut ctx.rng) {
                ctx.try_absorb();
            }
        }
        sync_leaf(ctx, self.decay(ctx.unit.absorbed));

        if let Some(offspring) = &self.offspring {
            offspring_trial(offspring, ctx);
        }
    }

    fn exit(&mut self, ctx: &mut GrowthContext) {
        ctx.destroy_unit_visual();
    }
}

// ---------------------------------------------------------------------------
// Mature
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct MatureState {
    offspring: Option<OffspringParams>,
    lifespan_left: Option<u32>,
    offspring_left: Option<u32>,
    absorb: Option<AbsorbTimer>,
    absorption_limit: Option<u32>,
    random_yaw: bool,
}

impl MatureState {
    pub fn new(data: &SpeciesData, rng: &mut SimRng) -> Self {
        let absorbing = data.absorption.filter(|a| a.absorb_while_mature);
        Self {
            offspring: data.mature_offspring,
            lifespan_left: data.mature_lifespan_days,
            offspring_left: data.offspring_cap,
            absorb: absorbing.map(|a| AbsorbTimer::new(&a, rng)),
            absorption_limit: absorbing.and_then(|a| a.lifetime_limit),
            random_yaw: data.random_yaw,
        }
    }

    pub fn lifespan_left(&self) -> Option<u32> {
        self.lifespan_left
    }

    pub fn offspring_left(&self) -> Option<u32> {
        self.offspring_left
    }

    fn decay(&self, absorbed: u32) -> f32 {
        self.absorption_limit
            .map_or(0.0, |limit| fraction(absorbed, limit))
    }
}

impl State<GrowthContext> for MatureState {
    fn enter(&mut self, ctx: &mut GrowthContext) {
        if ctx.unit.is_dead() {
            return;
        }
        create_leaf(ctx, self.random_yaw, self.decay(ctx.unit.absorbed));
    }

    fn update(&mut self, ctx: &mut GrowthContext) {
        if ctx.unit.is_dead() {
            return;
        }

        if let Some(timer) = &mut self.absorb {
            if timer.tick(&mut ctx.rng) && ctx.try_absorb() == AbsorbOutcome::Absorbed {
                sync_leaf(ctx, self.decay(ctx.unit.absorbed));
                if self
                    .absorption_limit
                    .is_some_and(|limit| ctx.unit.absorbed >= limit)
                {
                    ctx.unit.wither(WitherCause::AbsorptionLimit);
                    return;
                }
            }
        }

        if let Some(offspring) = &self.offspring {
            if offspring_trial(offspring, ctx) {
                if let Some(left) = &mut self.offspring_left {
                    *left = left.saturating_sub(1);
                    if *left == 0 {
                        ctx.unit.wither(WitherCause::OffspringExhausted);
                        return;
                    }
                }
            }
        }

        if let Some(left) = &mut self.lifespan_left {
            *left = left.saturating_sub(1);
            if *left == 0 {
                ctx.unit.wither(WitherCause::OldAge);
            }
        }
    }

    fn exit(&mut self, ctx: &mut GrowthContext) {
        ctx.destroy_unit_visual();
    }
}

// ---------------------------------------------------------------------------
// Dormant
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct DormantState {
    params: DormancyParams,
}

impl DormantState {
    pub fn new(params: DormancyParams) -> Self {
        Self { params }
    }
}

impl State<GrowthContext> for DormantState {
    fn update(&mut self, ctx: &mut GrowthContext) {
        if ctx.unit.is_dead() {
            return;
        }
        if ctx.rng.chance(self.params.daily_wither_chance) {
            ctx.unit.wither(WitherCause::DormantWither);
        }
    }
}

// ---------------------------------------------------------------------------
// The state enum and machine assembly
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub enum GrowthState {
    Seed(SeedState),
    Growing(GrowingState),
    Mature(MatureState),
    Dormant(DormantState),
}

impl GrowthState {
    pub fn stage(&self) -> Stage {
        match self {
            GrowthState::Seed(_) => Stage::Seed,
            GrowthState::Growing(_) => Stage::Growing,
            GrowthState::Mature(_) => Stage::Mature,
            GrowthState::Dormant(_) => Stage::Dormant,
        }
    }

    fn will_grow(&self) -> bool {
        matches!(self, GrowthState::Seed(s) if s.will_grow())
    }

    fn reached_target(&self, unit: &UnitBody) -> bool {
        matches!(self, GrowthState::Growing(g) if g.reached_target(unit))
    }
}

impl State<GrowthContext> for GrowthState {
    fn enter(&mut self, ctx: &mut GrowthContext) {
        match self {
            GrowthState::Seed(s) => s.enter(ctx),
            GrowthState::Growing(s) => s.enter(ctx),
            GrowthState::Mature(s) => s.enter(ctx),
            GrowthState::Dormant(s) => s.enter(ctx),
        }
    }

    fn update(&mut self, ctx: &mut GrowthContext) {
        match self {
            GrowthState::Seed(s) => s.update(ctx),
            GrowthState::Growing(s) => s.update(ctx),
            GrowthState::Mature(s) => s.update(ctx),
            GrowthState::Dormant(s) => s.update(ctx),
        }
    }

    fn exit(&mut self, ctx: &mut GrowthContext) {
        match self {
            GrowthState::Seed(s) => s.exit(ctx),
            GrowthState::Growing(s) => s.exit(ctx),
            GrowthState::Mature(s) => s.exit(ctx),
            GrowthState::Dormant(s) => s.exit(ctx),
        }
    }
}

fn when(cond: bool, effect: TransitionEffect) -> TransitionEffect {
    if cond { effect } else { TransitionEffect::NoAction }
}

/// Build and start the state machine for the unit currently in
/// `ctx.unit`. The seed state is entered immediately.
pub fn build_machine(
    data: &SpeciesData,
    ctx: &mut GrowthContext,
) -> StateMachine<GrowthState, GrowthContext> {
    let mut graph = StateGraph::new();
    let seed = graph.add_state(GrowthState::Seed(SeedState::new(
        data.seed,
        data.contests_cells(),
        &mut ctx.rng,
    )));
    let growing = graph.add_state(GrowthState::Growing(GrowingState::new(data, &mut ctx.rng)));
    let mature = graph.add_state(GrowthState::Mature(MatureState::new(data, &mut ctx.rng)));

    graph.add_transition(
        seed,
        StateTransition::new(|s: &GrowthState, _: &GrowthContext| {
            when(s.will_grow(), TransitionEffect::Swap)
        })
        .to(growing)
        .with_action(|ctx: &mut GrowthContext| {
            if !ctx.unit.is_dead() {
                let (plant_id, unit_id) = (ctx.unit.plant, ctx.unit.id);
                ctx.emit(SimEventKind::SeedSprouted { plant_id, unit_id });
            }
        }),
    );
    graph.add_transition(
        growing,
        StateTransition::new(|s: &GrowthState, ctx: &GrowthContext| {
            when(s.reached_target(&ctx.unit), TransitionEffect::Swap)
        })
        .to(mature)
        .with_action(|ctx: &mut GrowthContext| {
            let (plant_id, unit_id) = (ctx.unit.plant, ctx.unit.id);
            ctx.emit(SimEventKind::UnitMatured { plant_id, unit_id });
        }),
    );

    if let Some(dormancy) = data.dormancy {
        let dormant = graph.add_state(GrowthState::Dormant(DormantState::new(dormancy)));
        let season = dormancy.season;
        for from in [seed, growing, mature] {
            graph.add_transition(
                from,
                StateTransition::new(move |_: &GrowthState, ctx: &GrowthContext| {
                    when(ctx.season == season, TransitionEffect::Push)
                })
                .to(dormant)
                .with_action(|ctx: &mut GrowthContext| {
                    let (plant_id, unit_id) = (ctx.unit.plant, ctx.unit.id);
                    ctx.emit(SimEventKind::EnteredDormancy { plant_id, unit_id });
                }),
            );
        }
        graph.add_transition(
            dormant,
            StateTransition::new(move |_: &GrowthState, ctx: &GrowthContext| {
                when(ctx.season != season, TransitionEffect::Pop)
            })
            .with_action(|ctx: &mut GrowthContext| {
                let (plant_id, unit_id) = (ctx.unit.plant, ctx.unit.id);
                ctx.emit(SimEventKind::LeftDormancy { plant_id, unit_id });
            }),
        );
    }

    graph.start(seed, ctx)
}

// ---------------------------------------------------------------------------
// Growth unit
// ---------------------------------------------------------------------------

/// One growth unit: its body plus its life-cycle machine.
#[derive(Debug)]
pub struct GrowthUnit {
    pub body: UnitBody,
    machine: StateMachine<GrowthState, GrowthContext>,
}

impl GrowthUnit {
    /// Create the unit and enter its seed state.
    pub fn spawn(mut body: UnitBody, data: &SpeciesData, ctx: &mut GrowthContext) -> Self {
        std::mem::swap(&mut ctx.unit, &mut body);
        let machine = build_machine(data, ctx);
        std::mem::swap(&mut ctx.unit, &mut body);
        Self { body, machine }
    }

    /// Run one day of the unit's state machine.
    pub fn update(&mut self, ctx: &mut GrowthContext) {
        std::mem::swap(&mut ctx.unit, &mut self.body);
        self.machine.update(ctx);
        std::mem::swap(&mut ctx.unit, &mut self.body);
    }

    pub fn is_dead(&self) -> bool {
        self.body.is_dead()
    }

    pub fn stage(&self) -> Stage {
        self.machine.current_state().stage()
    }

    /// Stack depth of the unit's machine (2 while dormant).
    pub fn depth(&self) -> usize {
        self.machine.depth()
    }

    /// Growing days accrued, if the unit is growing (possibly interrupted
    /// by dormancy).
    pub fn growing_days(&self) -> Option<u32> {
        self.machine
            .stack()
            .iter()
            .find_map(|id| match self.machine.state(*id) {
                GrowthState::Growing(g) => Some(g.elapsed_days()),
                _ => None,
            })
    }

    pub fn current_state(&self) -> &GrowthState {
        self.machine.current_state()
    }
}
