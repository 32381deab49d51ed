use glam::DVec3;

/// Depth offset the viewer pushes the figure back by when centering it.
pub const VIEW_DEPTH_OFFSET: f64 = 25.0;

/// Padding added to the largest root-motion extent when framing the figure.
pub const BOUNDS_PADDING: f64 = 2.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ChannelKind {
    XRotation,
    YRotation,
    ZRotation,
    XPosition,
    YPosition,
    ZPosition,
}

impl ChannelKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "Xrotation" => Some(Self::XRotation),
            "Yrotation" => Some(Self::YRotation),
            "Zrotation" => Some(Self::ZRotation),
            "Xposition" => Some(Self::XPosition),
            "Yposition" => Some(Self::YPosition),
            "Zposition" => Some(Self::ZPosition),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Self::XRotation => "Xrotation",
            Self::YRotation => "Yrotation",
            Self::ZRotation => "Zrotation",
            Self::XPosition => "Xposition",
            Self::YPosition => "Yposition",
            Self::ZPosition => "Zposition",
        }
    }

    pub fn is_rotation(self) -> bool {
        matches!(self, Self::XRotation | Self::YRotation | Self::ZRotation)
    }

    pub fn is_position(self) -> bool {
        !self.is_rotation()
    }

    /// 0, 1 or 2 for the X, Y or Z axis.
    pub fn axis(self) -> usize {
        match self {
            Self::XRotation | Self::XPosition => 0,
            Self::YRotation | Self::YPosition => 1,
            Self::ZRotation | Self::ZPosition => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    /// Owning joint.
    pub joint: usize,
    pub kind: ChannelKind,
    /// Column of this channel in every motion row.
    pub index: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub name: String,
    pub index: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Rest offset from the parent joint.
    pub offset: DVec3,
    /// `End Site` endpoint, present on terminal joints only.
    pub site: Option<DVec3>,
    /// Indices into `MotionDocument::channels`, in declaration order.
    pub channels: Vec<usize>,
}

impl Joint {
    pub(crate) fn new(name: String, index: usize, parent: Option<usize>) -> Self {
        Self {
            name,
            index,
            parent,
            children: Vec::new(),
            offset: DVec3::ZERO,
            site: None,
            channels: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_site(&self) -> bool {
        self.site.is_some()
    }
}

/// Extent of the root motion over all frames, used to frame the figure.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub min: DVec3,
    pub max: DVec3,
    /// Largest axis extent plus [`BOUNDS_PADDING`].
    pub size: f64,
}

impl Bounds {
    pub(crate) fn from_points(points: impl IntoIterator<Item = DVec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        let extent = max - min;
        Some(Self {
            min,
            max,
            size: extent.max_element() + BOUNDS_PADDING,
        })
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    /// Translation that centers the figure in x/y and pushes it back along z.
    pub fn centering_offset(&self) -> DVec3 {
        let center = self.center();
        DVec3::new(-center.x, -center.y, self.min.z - VIEW_DEPTH_OFFSET)
    }
}
