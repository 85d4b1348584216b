/// 連続フレームカウンタ
///
/// 条件が `required` フレーム連続で成立したら確定する
#[derive(Debug, Clone)]
pub struct Debounce {
    required: u32,
    count: u32,
}

impl Debounce {
    pub fn new(required: u32) -> Self {
        Self { required, count: 0 }
    }

    /// 1フレーム成立。確定したら true
    pub fn hit(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count >= self.required
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// イベント途中の検出欠損カウンタ
///
/// 連続欠損が `tolerance` を超えたら打ち切り
#[derive(Debug, Clone)]
pub struct GapTracker {
    tolerance: u32,
    missing: u32,
}

impl GapTracker {
    pub fn new(tolerance: u32) -> Self {
        Self {
            tolerance,
            missing: 0,
        }
    }

    /// 欠損フレームを1つ数える。許容を超えたら true
    pub fn miss(&mut self) -> bool {
        self.missing = self.missing.saturating_add(1);
        self.missing > self.tolerance
    }

    pub fn clear(&mut self) {
        self.missing = 0;
    }

    pub fn missing(&self) -> u32 {
        self.missing
    }
}
