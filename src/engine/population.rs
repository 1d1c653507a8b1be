use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::target::{Catalog, Difficulty, Payload, Target};

pub type ItemId = u64;

const DISTRACTOR_ATTEMPTS: usize = 100;
const POSITION_ATTEMPTS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub velocity: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub payload: Payload,
    pub popped: bool,
    pub motion: Option<Motion>,
}

/// Geometry of the falling-item playfield, in host units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FallingField {
    pub width: f32,
    pub item_size: f32,
    pub min_distance: f32,
    pub base_speed: f32,
}

impl Default for FallingField {
    fn default() -> Self {
        Self {
            width: 360.0,
            item_size: 64.0,
            min_distance: 72.0,
            base_speed: 80.0,
        }
    }
}

pub fn count_matching(items: &[Item], target: &Target) -> usize {
    items.iter().filter(|it| target.matches(&it.payload)).count()
}

/// Builds item populations. Owns the id counter so ids are never reused
/// across rounds.
#[derive(Debug, Default)]
pub struct PopulationGenerator {
    next_id: ItemId,
}

impl PopulationGenerator {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    fn fresh_id(&mut self) -> ItemId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    fn item(&mut self, payload: Payload) -> Item {
        Item {
            id: self.fresh_id(),
            payload,
            popped: false,
            motion: None,
        }
    }

    pub fn generate(
        &mut self,
        target: &Target,
        total_slots: usize,
        target_count: usize,
        catalog: Catalog,
        rng: &mut SmallRng,
    ) -> Vec<Item> {
        let total_slots = total_slots.max(1);
        let target_count = target_count.clamp(1, total_slots);
        let target_payload = target.payload();

        let mut items: Vec<Item> = (0..target_count)
            .map(|_| self.item(target_payload))
            .collect();

        let distractors = match target {
            Target::Arithmetic(p) => numeric_distractors(p.answer, total_slots - target_count, rng),
            _ => catalog_distractors(catalog, &target_payload, total_slots - target_count, rng),
        };
        for payload in distractors {
            let item = self.item(payload);
            items.push(item);
        }

        items.shuffle(rng);
        ensure_target(&mut items, target);
        items
    }

    pub fn generate_falling(
        &mut self,
        target: &Target,
        total_slots: usize,
        target_count: usize,
        catalog: Catalog,
        field: &FallingField,
        difficulty: Difficulty,
        rng: &mut SmallRng,
    ) -> Vec<Item> {
        let mut items = self.generate(target, total_slots, target_count, catalog, rng);
        let mut placed: Vec<Motion> = Vec::with_capacity(items.len());
        for (i, item) in items.iter_mut().enumerate() {
            let motion = place(field, difficulty, &placed, i, rng);
            placed.push(motion);
            item.motion = Some(motion);
        }
        items
    }

    /// Fresh item for one that left the screen. Keeps the payload so the
    /// number of findable targets does not shrink.
    pub fn replacement_for(
        &mut self,
        old: &Item,
        live: &[Item],
        field: &FallingField,
        difficulty: Difficulty,
        rng: &mut SmallRng,
    ) -> Item {
        let placed: Vec<Motion> = live
            .iter()
            .filter(|it| it.id != old.id && !it.popped)
            .filter_map(|it| it.motion)
            .collect();
        let mut item = self.item(old.payload);
        item.motion = Some(place(field, difficulty, &placed, 0, rng));
        item
    }
}

/// Structural guard: a population must always contain the target.
pub fn ensure_target(items: &mut [Item], target: &Target) {
    if count_matching(items, target) == 0 {
        if let Some(first) = items.first_mut() {
            debug!(id = first.id, "forcing target payload into population");
            first.payload = target.payload();
        }
    }
}

fn catalog_distractors(
    catalog: Catalog,
    target: &Payload,
    count: usize,
    rng: &mut SmallRng,
) -> Vec<Payload> {
    let candidates: Vec<Payload> = (0..catalog.len())
        .filter_map(|i| catalog.payload_at(i))
        .filter(|p| p != target)
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|_| candidates[rng.gen_range(0..candidates.len())])
        .collect()
}

fn numeric_distractors(answer: u32, count: usize, rng: &mut SmallRng) -> Vec<Payload> {
    let upper = (answer + 5).max(10);
    let mut picked: Vec<u32> = Vec::with_capacity(count);
    let mut attempts = 0;
    while picked.len() < count {
        let candidate = rng.gen_range(0..=upper);
        attempts += 1;
        let unique = candidate != answer && !picked.contains(&candidate);
        if unique || attempts >= DISTRACTOR_ATTEMPTS {
            if !unique {
                debug!(candidate, "distractor retry budget spent, accepting duplicate");
            }
            // Even a duplicate must never equal the answer.
            picked.push(if candidate == answer { answer + 1 } else { candidate });
        }
    }
    picked.into_iter().map(Payload::Number).collect()
}

fn place(
    field: &FallingField,
    difficulty: Difficulty,
    placed: &[Motion],
    stagger: usize,
    rng: &mut SmallRng,
) -> Motion {
    let half = field.item_size / 2.0;
    let lo = half;
    let hi = field.width - half;
    // A field narrower than one item leaves a single usable column.
    let draw_x = |rng: &mut SmallRng| if hi <= lo { lo } else { rng.gen_range(lo..hi) };

    let mut x = draw_x(rng);
    for _ in 1..POSITION_ATTEMPTS {
        if placed
            .iter()
            .all(|m| (m.x - x).abs() >= field.min_distance)
        {
            break;
        }
        x = draw_x(rng);
    }

    Motion {
        x,
        y: -field.item_size * (1.0 + stagger as f32 * 0.75),
        size: field.item_size,
        velocity: field.base_speed * difficulty.speed_factor() * rng.gen_range(0.8..1.2),
    }
}
