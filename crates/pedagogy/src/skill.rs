//! Practice-skill picking.
//!
//! Generation prompts name a few skills to emphasize so consecutive sessions
//! don't feel identical. The random source is always injected: production
//! code passes a seeded `StdRng`, tests pass a fixed seed.

use edupilot_core::IntentType;
use rand::Rng;
use rand::seq::SliceRandom;

/// Candidate practice skills for an intent.
pub fn skills_for(intent: IntentType) -> &'static [&'static str] {
    match intent {
        IntentType::Reinforce => &["基础计算", "概念辨析", "错因分析", "例题模仿", "口算"],
        IntentType::Verify => &["概念辨析", "变式练习", "易错点检查", "步骤表达"],
        IntentType::Challenge => &["综合应用", "多步推理", "开放探究", "一题多解"],
        IntentType::Lighten => &["趣味游戏", "口算", "生活情境"],
        IntentType::Introduce => &["情境导入", "新概念感知", "动手操作"],
        IntentType::Pause => &[],
    }
}

/// Choose up to `n` distinct skills from `candidates`.
pub fn pick_skills<R: Rng + ?Sized>(candidates: &[&str], n: usize, rng: &mut R) -> Vec<String> {
    let mut pool: Vec<&str> = candidates.to_vec();
    pool.sort_unstable();
    pool.dedup();
    pool.shuffle(rng);
    pool.into_iter().take(n).map(str::to_string).collect()
}
