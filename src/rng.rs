// src/rng.rs
//! Источник случайности, который протягивается через все стадии конвейера
//!
//! Вся генерация одного подземелья потребляет одну линейную последовательность
//! случайных чисел. Поэтому источник передаётся явно (`&mut dyn RandomSource`),
//! а не живёт в глобальном состоянии: два параллельных вызова генерации не
//! мешают друг другу, а стадии можно тестировать на заранее заданной
//! последовательности.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait RandomSource {
    /// Равномерное целое в `[0, bound)`. `bound` должен быть больше нуля.
    fn next_below(&mut self, bound: u32) -> u32;

    /// Равномерное число в `[0.0, 1.0)`
    fn next_unit(&mut self) -> f64;

    /// Бросок с вероятностью `probability`. Значения вне `[0, 1]` обрезаются.
    fn chance(&mut self, probability: f64) -> bool {
        let p = probability.clamp(0.0, 1.0);
        self.next_unit() < p
    }

    /// Взвешенный выбор по накопленной сумме весов.
    ///
    /// Бросаем целое в `[0, total)` и идём по списку, накапливая веса, пока бросок
    /// не попадёт в отрезок элемента. Элементы с нулевым весом никогда не выбираются.
    /// Возвращает `None`, если сумма весов равна нулю (случайное число при этом не тратится).
    fn pick_weighted(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();
        if total == 0 {
            return None;
        }
        let total = u32::try_from(total).unwrap_or(u32::MAX);
        let roll = self.next_below(total);

        let mut cumulative: u32 = 0;
        for (i, &w) in weights.iter().enumerate() {
            cumulative = cumulative.saturating_add(w);
            if roll < cumulative {
                return Some(i);
            }
        }
        // При насыщении суммы хвост может не покрыться; отдаём последний ненулевой
        weights.iter().rposition(|&w| w > 0)
    }
}

/// Детерминированный источник на ChaCha8: одинаковый сид даёт одинаковую
/// последовательность на любой платформе.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: ChaCha8Rng,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        self.rng.gen_range(0..bound.max(1))
    }

    fn next_unit(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Источник с заранее заданной последовательностью бросков для тестов стадий.
///
/// `next_below` возвращает очередное значение по модулю `bound`, `next_unit`
/// делит его на 100. Когда последовательность заканчивается, выдаются нули.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    values: std::collections::VecDeque<u32>,
    pub draws: usize,
}

#[cfg(test)]
impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self {
            values: values.into_iter().collect(),
            draws: 0,
        }
    }

    fn next_raw(&mut self) -> u32 {
        self.draws += 1;
        self.values.pop_front().unwrap_or(0)
    }
}

#[cfg(test)]
impl RandomSource for ScriptedRandom {
    fn next_below(&mut self, bound: u32) -> u32 {
        self.next_raw() % bound.max(1)
    }

    fn next_unit(&mut self) -> f64 {
        f64::from(self.next_raw() % 100) / 100.0
    }
}
