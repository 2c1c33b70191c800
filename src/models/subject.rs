/// 题库科目分桶
///
/// 兜底出题时根据用户填写的科目名选择模板组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectBucket {
    /// 数学（含代数）
    Mathematics,
    /// 生物
    Biology,
    /// 化学
    Chemistry,
    /// 物理
    Physics,
    /// 通用模板，按主题填充
    General,
}

impl SubjectBucket {
    /// 匹配顺序：先匹配到的分桶优先
    const MATCH_ORDER: [SubjectBucket; 4] = [
        SubjectBucket::Mathematics,
        SubjectBucket::Biology,
        SubjectBucket::Chemistry,
        SubjectBucket::Physics,
    ];

    /// 分桶对应的关键字（小写）
    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            SubjectBucket::Mathematics => &["math", "algebra"],
            SubjectBucket::Biology => &["biology"],
            SubjectBucket::Chemistry => &["chemistry"],
            SubjectBucket::Physics => &["physics"],
            SubjectBucket::General => &[],
        }
    }

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            SubjectBucket::Mathematics => "mathematics",
            SubjectBucket::Biology => "biology",
            SubjectBucket::Chemistry => "chemistry",
            SubjectBucket::Physics => "physics",
            SubjectBucket::General => "general",
        }
    }

    /// 智能查找分桶（大小写不敏感的子串匹配）
    ///
    /// 没有任何关键字命中时返回 `General`
    pub fn find(subject: &str) -> Self {
        let subject_lower = subject.to_lowercase();
        Self::MATCH_ORDER
            .into_iter()
            .find(|bucket| bucket.keywords().iter().any(|kw| subject_lower.contains(kw)))
            .unwrap_or(SubjectBucket::General)
    }
}

impl std::fmt::Display for SubjectBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
